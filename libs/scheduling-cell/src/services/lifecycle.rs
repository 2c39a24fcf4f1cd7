// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentStatus, CancelParty, QuickAction, SchedulingError};

/// The appointment lifecycle state machine.
///
/// Forward chain: Scheduled -> Confirmed -> CheckedIn -> InProgress ->
/// Completed. Cancellation is a side action permitted from any non-terminal
/// state; no-show is a side action permitted from Scheduled/Confirmed only.
/// All computation here is pure: the system-of-record change happens
/// through the persistence layer, and this machine is consulted both to
/// gate UI affordances and to decide what request to send.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// One step along the forward chain, or None for terminal states.
    pub fn next_forward_status(&self, status: &AppointmentStatus) -> Option<AppointmentStatus> {
        match status {
            AppointmentStatus::Scheduled => Some(AppointmentStatus::Confirmed),
            AppointmentStatus::Confirmed => Some(AppointmentStatus::CheckedIn),
            AppointmentStatus::CheckedIn => Some(AppointmentStatus::InProgress),
            AppointmentStatus::InProgress => Some(AppointmentStatus::Completed),
            AppointmentStatus::Completed
            | AppointmentStatus::CancelledClient
            | AppointmentStatus::CancelledClinic
            | AppointmentStatus::NoShow => None,
        }
    }

    /// All valid next statuses for a given current status: the forward step
    /// plus the permitted side actions.
    pub fn valid_transitions(&self, status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::CancelledClient,
                AppointmentStatus::CancelledClinic,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::CheckedIn,
                AppointmentStatus::CancelledClient,
                AppointmentStatus::CancelledClinic,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::CheckedIn => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::CancelledClient,
                AppointmentStatus::CancelledClinic,
            ],
            AppointmentStatus::InProgress => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::CancelledClient,
                AppointmentStatus::CancelledClinic,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::CancelledClient
            | AppointmentStatus::CancelledClinic
            | AppointmentStatus::NoShow => vec![],
        }
    }

    /// Editing (move/resize) is allowed only before the visit has begun.
    pub fn can_edit(&self, status: &AppointmentStatus) -> bool {
        matches!(
            status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    /// Cancellation is allowed from every non-terminal status.
    pub fn can_cancel(&self, status: &AppointmentStatus) -> bool {
        !status.is_terminal()
    }

    /// No-show only applies while the clinic is still waiting for arrival.
    pub fn can_mark_no_show(&self, status: &AppointmentStatus) -> bool {
        matches!(
            status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    /// Map a quick action to the status it produces from the current one.
    /// An action that is not valid for the current state is rejected with no
    /// state change.
    pub fn apply_quick_action(
        &self,
        status: &AppointmentStatus,
        action: QuickAction,
        cancel_party: CancelParty,
    ) -> Result<AppointmentStatus, SchedulingError> {
        debug!("Applying quick action {} from status {}", action, status);

        let next = match (action, status) {
            (QuickAction::Confirm, AppointmentStatus::Scheduled) => AppointmentStatus::Confirmed,
            (QuickAction::CheckIn, AppointmentStatus::Confirmed) => AppointmentStatus::CheckedIn,
            (QuickAction::Start, AppointmentStatus::CheckedIn) => AppointmentStatus::InProgress,
            (QuickAction::Complete, AppointmentStatus::InProgress) => AppointmentStatus::Completed,
            (QuickAction::Cancel, current) if self.can_cancel(current) => {
                cancel_party.cancelled_status()
            }
            (action, current) => {
                warn!("Rejected quick action {} from status {}", action, current);
                return Err(SchedulingError::InvalidTransition {
                    from: *current,
                    action,
                });
            }
        };

        Ok(next)
    }

    /// The no-show side transition.
    pub fn mark_no_show(
        &self,
        status: &AppointmentStatus,
    ) -> Result<AppointmentStatus, SchedulingError> {
        if self.can_mark_no_show(status) {
            Ok(AppointmentStatus::NoShow)
        } else {
            warn!("Rejected no-show from status {}", status);
            Err(SchedulingError::NotEditable(*status))
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
