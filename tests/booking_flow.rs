//! End-to-end walk through the public API: an admin sets up the directory,
//! provisions a worker account, books appointments around conflicts, and
//! settles the invoice.

use std::sync::Arc;

use caresched::model::*;
use caresched::{MemoryStore, RequestContext, ScheduleError, Scheduler};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ulid::Ulid;

fn monday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

#[tokio::test]
async fn full_booking_and_billing_flow() {
    let sched = Scheduler::new(Arc::new(MemoryStore::new()));
    let admin = RequestContext::admin(Ulid::new());

    // Directory setup.
    let worker = sched
        .create_worker(
            &admin,
            NewWorker {
                name: "Ana Moreau".into(),
                contact: "555-0100".into(),
                job_title: "caregiver".into(),
                availability: WeeklyAvailability::weekdays(),
            },
        )
        .await
        .unwrap();
    let client = sched
        .create_client(
            &admin,
            NewClient {
                name: "Henri Blanc".into(),
                contact: "555-0200".into(),
                address: "4 Quai des Ormes".into(),
                emergency_contact: Some(EmergencyContact {
                    name: "Claire Blanc".into(),
                    phone: "555-0201".into(),
                }),
                notes: None,
            },
        )
        .await
        .unwrap();
    let service = sched
        .create_service(
            &admin,
            NewService {
                name: "home visit".into(),
                duration_minutes: 60,
                base_price: "45.00".parse().unwrap(),
            },
        )
        .await
        .unwrap();

    // Account provisioning forces a password change on first session.
    sched
        .provision_account(&admin, worker.id, "ana@example.org".into(), SystemRole::Worker)
        .await
        .unwrap();
    let session = sched.begin_session("ana@example.org").await.unwrap();
    assert!(session.must_change_password);
    sched.complete_password_change(worker.id).await.unwrap();
    let session = sched.begin_session("ana@example.org").await.unwrap();
    assert!(!session.must_change_password);

    // Morning booking lands inside declared availability.
    let first = sched
        .create_appointment(
            &admin,
            NewAppointment {
                worker_id: worker.id,
                client_id: client.id,
                service_id: service.id,
                start: monday(9, 0),
                end: monday(10, 0),
                status: None,
                location: "client home".into(),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.advisory, Some(true));

    // A second booking over the same hour is refused with the blocker's id.
    let clash = sched
        .create_appointment(
            &admin,
            NewAppointment {
                worker_id: worker.id,
                client_id: client.id,
                service_id: service.id,
                start: monday(9, 30),
                end: monday(10, 30),
                status: None,
                location: "client home".into(),
                notes: None,
            },
        )
        .await;
    match clash {
        Err(ScheduleError::SchedulingConflict { existing }) => {
            assert_eq!(existing, Some(first.appointment.id));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // The session's worker adjusts their own notes on the visit record.
    let updated = sched
        .update_appointment(
            &session,
            first.appointment.id,
            AppointmentPatch {
                notes: Some("bring paperwork".into()),
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.appointment.status, AppointmentStatus::Completed);

    // Billing: amount comes from the service, paying stamps today.
    let invoice = sched
        .create_invoice(
            &admin,
            NewInvoice {
                client_id: client.id,
                appointment_id: first.appointment.id,
                amount: None,
                status: None,
                due_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(invoice.amount, "45.00".parse().unwrap());

    let paid = sched
        .update_invoice(
            &admin,
            invoice.id,
            InvoicePatch {
                status: Some(InvoiceStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(paid.paid_date, Some(Utc::now().date_naive()));

    // The invoiced visit cannot be deleted until the invoice goes.
    assert!(matches!(
        sched.delete_appointment(&admin, first.appointment.id).await,
        Err(ScheduleError::HasDependents(_))
    ));
    sched.delete_invoice(&admin, invoice.id).await.unwrap();
    sched
        .delete_appointment(&admin, first.appointment.id)
        .await
        .unwrap();

    // Schedule is empty again; the slot is bookable.
    let remaining = sched
        .worker_schedule(worker.id, monday(0, 0), monday(23, 59))
        .await
        .unwrap();
    assert!(remaining.is_empty());
}
