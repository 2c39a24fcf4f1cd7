// libs/scheduling-cell/src/services/reschedule.rs
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, BookedInterval, RescheduleOutcome, RevertReason, MAX_APPOINTMENT_MINUTES,
    MIN_APPOINTMENT_MINUTES,
};
use crate::services::availability::AvailabilityEngine;
use crate::services::lifecycle::AppointmentLifecycleService;

/// Coordinates interactive move/resize gestures against the remote store.
///
/// Validation runs client-side first and never touches the network; a
/// gesture that survives validation results in exactly one mutation request
/// specifying the full target value. The returned outcome is settled: the
/// caller keeps the confirmed record on `Applied` and restores the
/// pre-gesture position on `Reverted`, so the rendered calendar never shows
/// a value the store has not confirmed.
pub struct RescheduleCoordinator {
    supabase: SupabaseClient,
    engine: AvailabilityEngine,
    lifecycle: AppointmentLifecycleService,
}

impl RescheduleCoordinator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            engine: AvailabilityEngine::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Drag-to-reschedule: move the appointment to `new_start`, duration
    /// unchanged.
    pub async fn move_appointment(
        &self,
        appointment: &Appointment,
        new_start: DateTime<Utc>,
        auth_token: &str,
    ) -> RescheduleOutcome {
        debug!("Move request for appointment {} to {}", appointment.id, new_start);

        if !self.lifecycle.can_edit(&appointment.status) {
            return RescheduleOutcome::Reverted(RevertReason::NotEditable {
                status: appointment.status,
            });
        }

        let new_end = new_start + Duration::minutes(appointment.duration_minutes as i64);
        if let Some(reason) = self
            .revalidate_target(appointment, new_start, new_end, auth_token)
            .await
        {
            return RescheduleOutcome::Reverted(reason);
        }

        self.apply_update(
            appointment,
            json!({ "date_time": new_start.to_rfc3339() }),
            auth_token,
        )
        .await
    }

    /// Resize-to-redurate: keep the start, stretch the end to `new_end`.
    pub async fn resize_appointment(
        &self,
        appointment: &Appointment,
        new_end: DateTime<Utc>,
        auth_token: &str,
    ) -> RescheduleOutcome {
        let minutes = (new_end - appointment.date_time).num_minutes();
        debug!(
            "Resize request for appointment {} to {} minutes",
            appointment.id, minutes
        );

        if minutes < MIN_APPOINTMENT_MINUTES as i64 || minutes > MAX_APPOINTMENT_MINUTES as i64 {
            return RescheduleOutcome::Reverted(RevertReason::DurationOutOfRange { minutes });
        }

        if !self.lifecycle.can_edit(&appointment.status) {
            return RescheduleOutcome::Reverted(RevertReason::NotEditable {
                status: appointment.status,
            });
        }

        if let Some(reason) = self
            .revalidate_target(appointment, appointment.date_time, new_end, auth_token)
            .await
        {
            return RescheduleOutcome::Reverted(reason);
        }

        self.apply_update(
            appointment,
            json!({ "duration_minutes": minutes }),
            auth_token,
        )
        .await
    }

    /// Re-check the target interval against a fresh same-day snapshot before
    /// mutating. Narrows the window for a double-booking between this
    /// client's last fetch and the write; closing it entirely is the
    /// persistence layer's job.
    async fn revalidate_target(
        &self,
        appointment: &Appointment,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        auth_token: &str,
    ) -> Option<RevertReason> {
        let booked = match self.fetch_day_intervals(start, auth_token).await {
            Ok(intervals) => intervals,
            Err(message) => {
                warn!(
                    "Revalidation fetch failed for appointment {}: {}",
                    appointment.id, message
                );
                return Some(RevertReason::MutationFailed { message });
            }
        };

        let free = self.engine.interval_is_free(
            start,
            end,
            &booked,
            Some(appointment.id),
            appointment.staff_id,
        );

        if free {
            None
        } else {
            warn!(
                "Target slot for appointment {} is no longer free",
                appointment.id
            );
            Some(RevertReason::SlotConflict)
        }
    }

    async fn fetch_day_intervals(
        &self,
        reference: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, String> {
        let day_start = reference.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = reference
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc();

        let path = format!(
            "/rest/v1/appointments?date_time=gte.{}&date_time=lte.{}&status=in.(scheduled,confirmed,checked_in,in_progress)&order=date_time.asc",
            day_start.to_rfc3339(),
            day_end.to_rfc3339()
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| e.to_string())?;

        let appointments: Vec<Appointment> = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| format!("Failed to parse appointments: {}", e))?;

        Ok(appointments.iter().map(BookedInterval::from).collect())
    }

    async fn apply_update(
        &self,
        appointment: &Appointment,
        mut changes: Value,
        auth_token: &str,
    ) -> RescheduleOutcome {
        if let Some(map) = changes.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Result<Vec<Appointment>, _> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(changes), Some(headers))
            .await;

        match result {
            Ok(mut rows) if !rows.is_empty() => {
                debug!("Reschedule applied for appointment {}", appointment.id);
                RescheduleOutcome::Applied(rows.remove(0))
            }
            Ok(_) => {
                warn!("Update returned no row for appointment {}", appointment.id);
                RescheduleOutcome::Reverted(RevertReason::MutationFailed {
                    message: "Update affected no rows".to_string(),
                })
            }
            Err(e) => {
                warn!("Update failed for appointment {}: {}", appointment.id, e);
                RescheduleOutcome::Reverted(RevertReason::MutationFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}
