// libs/scheduling-cell/src/services/projection.rs
use crate::models::{
    Appointment, AppointmentStatus, CalendarEvent, EventColor, EventPriority,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Ordered priority classification data: first matching keyword set wins.
/// Keywords are matched case-insensitively as substrings of the visit
/// reason; unaccented spellings are included so keyboard-lazy input still
/// classifies. Kept as data rather than inline conditionals so the
/// precedence rule stays a single code path.
pub const PRIORITY_KEYWORDS: &[(EventPriority, &[&str])] = &[
    (
        EventPriority::Emergency,
        &["emergencia", "urgente", "accidente", "grave"],
    ),
    (
        EventPriority::High,
        &["cirugía", "cirugia", "operación", "operacion"],
    ),
    (
        EventPriority::Low,
        &["vacuna", "revisión", "revision", "control", "baño", "bano"],
    ),
];

const DEFAULT_EVENT_TITLE: &str = "Appointment";

/// Maps persisted appointment records into renderable calendar events.
/// A projection is ephemeral and 1:1; any change to the underlying
/// appointment produces a new event, never an in-place mutation.
pub struct CalendarProjector {
    lifecycle: AppointmentLifecycleService,
}

impl CalendarProjector {
    pub fn new() -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn project(&self, appointments: &[Appointment]) -> Vec<CalendarEvent> {
        appointments
            .iter()
            .map(|appointment| self.project_one(appointment))
            .collect()
    }

    pub fn project_one(&self, appointment: &Appointment) -> CalendarEvent {
        let title = appointment.reason.trim();

        CalendarEvent {
            id: appointment.id,
            title: if title.is_empty() {
                DEFAULT_EVENT_TITLE.to_string()
            } else {
                title.to_string()
            },
            start_date_time: appointment.date_time,
            end_date_time: appointment.scheduled_end_time(),
            color: color_for_status(&appointment.status),
            priority: classify_priority(&appointment.reason),
            can_edit: self.lifecycle.can_edit(&appointment.status),
            can_cancel: self.lifecycle.can_cancel(&appointment.status),
            appointment: appointment.clone(),
        }
    }
}

impl Default for CalendarProjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed per-status color triple. The match is total over the status enum,
/// so every record renders; the Scheduled entry doubles as the neutral
/// scheme.
pub fn color_for_status(status: &AppointmentStatus) -> EventColor {
    match status {
        AppointmentStatus::Scheduled => EventColor {
            background: "#DBEAFE",
            border: "#3B82F6",
            text: "#1E3A8A",
        },
        AppointmentStatus::Confirmed => EventColor {
            background: "#D1FAE5",
            border: "#10B981",
            text: "#064E3B",
        },
        AppointmentStatus::CheckedIn => EventColor {
            background: "#EDE9FE",
            border: "#8B5CF6",
            text: "#4C1D95",
        },
        AppointmentStatus::InProgress => EventColor {
            background: "#FEF3C7",
            border: "#F59E0B",
            text: "#78350F",
        },
        AppointmentStatus::Completed => EventColor {
            background: "#F3F4F6",
            border: "#6B7280",
            text: "#1F2937",
        },
        AppointmentStatus::CancelledClient => EventColor {
            background: "#FEE2E2",
            border: "#EF4444",
            text: "#7F1D1D",
        },
        AppointmentStatus::CancelledClinic => EventColor {
            background: "#FFE4E6",
            border: "#F43F5E",
            text: "#881337",
        },
        AppointmentStatus::NoShow => EventColor {
            background: "#FFEDD5",
            border: "#F97316",
            text: "#7C2D12",
        },
    }
}

/// Classify a visit reason into a priority tier. Stateless string function:
/// the ordered keyword sets are tested in declaration order and the first
/// match wins, so an emergency keyword beats a low-priority one appearing
/// in the same reason.
pub fn classify_priority(reason: &str) -> EventPriority {
    let normalized = reason.to_lowercase();

    for (priority, keywords) in PRIORITY_KEYWORDS {
        if keywords.iter().any(|keyword| normalized.contains(keyword)) {
            return *priority;
        }
    }

    EventPriority::Medium
}
