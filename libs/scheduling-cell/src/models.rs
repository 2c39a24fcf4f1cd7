// libs/scheduling-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounds on a single appointment, in minutes.
pub const MIN_APPOINTMENT_MINUTES: i32 = 15;
pub const MAX_APPOINTMENT_MINUTES: i32 = 300;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// An appointment row as stored by the persistence layer. Treated as an
/// immutable value per fetch cycle; every change goes through a mutation
/// request and a re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub customer_id: Uuid,
    /// None means any/unassigned staff.
    pub staff_id: Option<Uuid>,
    pub date_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: String,
    pub status: AppointmentStatus,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Scheduled end time derived from start and duration.
    pub fn scheduled_end_time(&self) -> DateTime<Utc> {
        self.date_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    CancelledClient,
    CancelledClinic,
    NoShow,
}

impl AppointmentStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::CancelledClient
                | AppointmentStatus::CancelledClinic
                | AppointmentStatus::NoShow
        )
    }

    /// Statuses that occupy calendar time for conflict purposes.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::Confirmed
                | AppointmentStatus::CheckedIn
                | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::CancelledClient => write!(f, "cancelled_client"),
            AppointmentStatus::CancelledClinic => write!(f, "cancelled_clinic"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// Named user-triggered lifecycle transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Confirm,
    #[serde(alias = "checkin")]
    CheckIn,
    Start,
    Complete,
    Cancel,
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuickAction::Confirm => write!(f, "confirm"),
            QuickAction::CheckIn => write!(f, "checkin"),
            QuickAction::Start => write!(f, "start"),
            QuickAction::Complete => write!(f, "complete"),
            QuickAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// Who initiated a cancellation. Resolved from the authenticated user's role
/// at the HTTP boundary; selects which cancellation state a `cancel` action
/// lands in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelParty {
    Client,
    Clinic,
}

impl CancelParty {
    pub fn cancelled_status(&self) -> AppointmentStatus {
        match self {
            CancelParty::Client => AppointmentStatus::CancelledClient,
            CancelParty::Clinic => AppointmentStatus::CancelledClinic,
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

/// A candidate appointment start time. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub start_date_time: DateTime<Utc>,
    pub display_time: String,
    pub period: DayPeriod,
}

/// Result of a slot computation for one day.
/// Invariant: `total_slots == available_count + occupied_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub slots: Vec<AvailabilitySlot>,
    pub total_slots: i32,
    pub available_count: i32,
    pub occupied_count: i32,
}

impl DayAvailability {
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            total_slots: 0,
            available_count: 0,
            occupied_count: 0,
        }
    }
}

/// The `[date_time, date_time + duration)` span occupied by an existing
/// appointment. Read-only snapshot data supplied by the caller per
/// computation; the engine never caches these.
#[derive(Debug, Clone, PartialEq)]
pub struct BookedInterval {
    pub appointment_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&Appointment> for BookedInterval {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            staff_id: appointment.staff_id,
            start: appointment.date_time,
            end: appointment.scheduled_end_time(),
        }
    }
}

// ==============================================================================
// CALENDAR PROJECTION MODELS
// ==============================================================================

/// Background/border/text triple for rendering an event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EventColor {
    pub background: &'static str,
    pub border: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Emergency,
    High,
    Medium,
    Low,
}

/// Renderable projection of one appointment. Derived fresh on every render
/// pass and never mutated in place.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub color: EventColor,
    pub priority: EventPriority,
    pub can_edit: bool,
    pub can_cancel: bool,
    pub appointment: Appointment,
}

// ==============================================================================
// VIEW RANGE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalendarView {
    Month,
    Week,
    Day,
}

impl CalendarView {
    /// Parse a textual view name. Unrecognized values fall back to the
    /// month view so the calendar always has a window to show.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "week" => CalendarView::Week,
            "day" => CalendarView::Day,
            "month" => CalendarView::Month,
            _ => CalendarView::Month,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ==============================================================================
// RESCHEDULE MODELS
// ==============================================================================

/// Why a move/resize gesture was reverted instead of applied.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RevertReason {
    NotEditable { status: AppointmentStatus },
    DurationOutOfRange { minutes: i64 },
    SlotConflict,
    MutationFailed { message: String },
}

/// Settled outcome of a reschedule gesture. On `Applied` the caller keeps
/// the confirmed record; on `Reverted` it restores the pre-gesture value.
/// There is never an unconfirmed intermediate state.
#[derive(Debug, Clone)]
pub enum RescheduleOutcome {
    Applied(Appointment),
    Reverted(RevertReason),
}

impl RescheduleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RescheduleOutcome::Applied(_))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub pet_id: Uuid,
    pub customer_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub date_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: String,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAppointmentRequest {
    pub new_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeAppointmentRequest {
    pub new_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickActionRequest {
    pub action: QuickAction,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

/// Optional filters applied when fetching appointments for a window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilters {
    pub staff_id: Option<Uuid>,
    pub pet_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

/// The read surface exposed to the view layer for a given range/date/duration.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSnapshot {
    pub range: DateRange,
    pub events: Vec<CalendarEvent>,
    pub slot_date: NaiveDate,
    pub available_slots: Vec<AvailabilitySlot>,
    pub total_slots: i32,
    pub available_count: i32,
    pub occupied_count: i32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid business hours configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Appointment cannot be modified in status {0}")]
    NotEditable(AppointmentStatus),

    #[error("Appointment duration {0} minutes is outside the allowed range")]
    DurationOutOfRange(i64),

    #[error("Action {action} is not valid from status {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: QuickAction,
    },

    #[error("Appointment not found")]
    NotFound,

    #[error("Failed to fetch appointments: {0}")]
    FetchFailed(String),

    #[error("Mutation rejected by persistence layer: {0}")]
    MutationFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
