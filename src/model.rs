use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Two half-open ranges overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

// ── Weekly availability ──────────────────────────────────────────

/// Half-day slot of a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    Afternoon,
}

impl Slot {
    /// Map an hour-of-day to a slot: [8,12) morning, [13,17) afternoon,
    /// anything else has no slot.
    pub fn from_hour(hour: u32) -> Option<Slot> {
        match hour {
            8..=11 => Some(Slot::Morning),
            13..=16 => Some(Slot::Afternoon),
            _ => None,
        }
    }
}

/// Declared weekly availability: 7 days x 2 half-day slots, indexed directly.
/// An unset cell means "not available".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    days: [[bool; 2]; 7],
}

impl WeeklyAvailability {
    pub fn closed() -> Self {
        Self::default()
    }

    /// Monday through Friday, both slots.
    pub fn weekdays() -> Self {
        let mut a = Self::default();
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ] {
            a.set(day, Slot::Morning, true);
            a.set(day, Slot::Afternoon, true);
        }
        a
    }

    pub fn set(&mut self, day: Weekday, slot: Slot, available: bool) {
        self.days[day.num_days_from_monday() as usize][slot as usize] = available;
    }

    pub fn is_available(&self, day: Weekday, slot: Slot) -> bool {
        self.days[day.num_days_from_monday() as usize][slot as usize]
    }
}

/// Evaluate a candidate start against a declared weekly availability table.
/// `None` means the start falls outside both half-day slots (no opinion).
pub fn slot_verdict(availability: &WeeklyAvailability, start: DateTime<Utc>) -> Option<bool> {
    let slot = Slot::from_hour(start.hour())?;
    Some(availability.is_available(start.weekday(), slot))
}

// ── Status enumerations (closed — unknown values are rejected) ───

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

// ── Accounts ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Worker,
    Admin,
}

/// Link between a worker and a login identity. Password material lives
/// outside the core; only the email and the forced-change flag are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBinding {
    pub email: String,
    pub role: SystemRole,
    pub must_change_password: bool,
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: Ulid,
    pub name: String,
    pub contact: String,
    /// Job function, free text.
    pub job_title: String,
    pub availability: WeeklyAvailability,
    pub active: bool,
    pub account: Option<AccountBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Ulid,
    pub name: String,
    pub contact: String,
    pub address: String,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub duration_minutes: u32,
    pub base_price: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub worker_id: Ulid,
    pub client_id: Ulid,
    pub service_id: Ulid,
    pub slot: TimeRange,
    pub status: AppointmentStatus,
    pub location: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Cancelled appointments never block a worker's schedule.
    pub fn blocks_schedule(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Ulid,
    pub client_id: Ulid,
    /// At most one invoice per appointment (enforced at the store too).
    pub appointment_id: Ulid,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Inputs: new records and patches ──────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorker {
    pub name: String,
    pub contact: String,
    pub job_title: String,
    #[serde(default)]
    pub availability: WeeklyAvailability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerPatch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub job_title: Option<String>,
    pub availability: Option<WeeklyAvailability>,
    pub active: Option<bool>,
}

impl WorkerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact.is_none()
            && self.job_title.is_none()
            && self.availability.is_none()
            && self.active.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub duration_minutes: u32,
    pub base_price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub duration_minutes: Option<u32>,
    pub base_price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub worker_id: Ulid,
    pub client_id: Ulid,
    pub service_id: Ulid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Defaults to `scheduled`.
    pub status: Option<AppointmentStatus>,
    pub location: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub worker_id: Option<Ulid>,
    pub client_id: Option<Ulid>,
    pub service_id: Option<Ulid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    /// True when the patch can move the appointment on a worker's timeline
    /// and therefore needs a conflict re-check.
    pub fn reschedules(&self) -> bool {
        self.worker_id.is_some() || self.start.is_some() || self.end.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_id: Ulid,
    pub appointment_id: Ulid,
    /// Defaults to the base price of the appointment's service.
    pub amount: Option<Decimal>,
    /// Defaults to `draft`.
    pub status: Option<InvoiceStatus>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    pub amount: Option<Decimal>,
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap() // a Monday
    }

    #[test]
    fn range_basics() {
        let r = TimeRange::new(at(10, 0), at(11, 0));
        assert_eq!(r.duration(), chrono::Duration::hours(1));
        assert!(r.contains_instant(at(10, 0)));
        assert!(r.contains_instant(at(10, 59)));
        assert!(!r.contains_instant(at(11, 0))); // half-open
    }

    #[test]
    fn range_overlap() {
        let a = TimeRange::new(at(10, 0), at(11, 0));
        let b = TimeRange::new(at(10, 30), at(11, 30));
        let c = TimeRange::new(at(11, 0), at(12, 0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // back-to-back, not overlapping
    }

    #[test]
    fn slot_hour_boundaries() {
        assert_eq!(Slot::from_hour(8), Some(Slot::Morning));
        assert_eq!(Slot::from_hour(11), Some(Slot::Morning));
        assert_eq!(Slot::from_hour(12), None); // lunch gap
        assert_eq!(Slot::from_hour(13), Some(Slot::Afternoon));
        assert_eq!(Slot::from_hour(16), Some(Slot::Afternoon));
        assert_eq!(Slot::from_hour(17), None);
        assert_eq!(Slot::from_hour(19), None);
        assert_eq!(Slot::from_hour(0), None);
    }

    #[test]
    fn availability_table_lookup() {
        let mut a = WeeklyAvailability::closed();
        a.set(Weekday::Mon, Slot::Morning, true);
        assert!(a.is_available(Weekday::Mon, Slot::Morning));
        assert!(!a.is_available(Weekday::Mon, Slot::Afternoon));
        assert!(!a.is_available(Weekday::Tue, Slot::Morning));
    }

    #[test]
    fn slot_verdict_mapping() {
        let mut avail = WeeklyAvailability::closed();
        avail.set(Weekday::Mon, Slot::Morning, true);

        assert_eq!(slot_verdict(&avail, at(9, 0)), Some(true));
        assert_eq!(slot_verdict(&avail, at(14, 0)), Some(false)); // declared unavailable
        assert_eq!(slot_verdict(&avail, at(19, 0)), None); // outside both slots
    }

    #[test]
    fn weekdays_template() {
        let a = WeeklyAvailability::weekdays();
        assert!(a.is_available(Weekday::Fri, Slot::Afternoon));
        assert!(!a.is_available(Weekday::Sat, Slot::Morning));
        assert!(!a.is_available(Weekday::Sun, Slot::Afternoon));
    }

    #[test]
    fn status_round_trip() {
        assert_eq!(
            "in_progress".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::InProgress
        );
        assert_eq!(AppointmentStatus::InProgress.as_str(), "in_progress");
        assert_eq!("paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("paused".parse::<AppointmentStatus>().is_err());
        assert!("refunded".parse::<InvoiceStatus>().is_err());

        // serde rejects unknown variants at the boundary too
        assert!(serde_json::from_str::<AppointmentStatus>("\"paused\"").is_err());
        assert!(serde_json::from_str::<InvoiceStatus>("\"refunded\"").is_err());
        assert_eq!(
            serde_json::from_str::<AppointmentStatus>("\"cancelled\"").unwrap(),
            AppointmentStatus::Cancelled
        );
    }

    #[test]
    fn cancelled_does_not_block() {
        let appt = Appointment {
            id: Ulid::new(),
            worker_id: Ulid::new(),
            client_id: Ulid::new(),
            service_id: Ulid::new(),
            slot: TimeRange::new(at(10, 0), at(11, 0)),
            status: AppointmentStatus::Cancelled,
            location: String::new(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!appt.blocks_schedule());
    }
}
