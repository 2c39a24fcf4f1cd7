// libs/scheduling-cell/src/services/calendar.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::{AppConfig, BusinessHours};
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentFilters, BookedInterval, CalendarSnapshot, CalendarView,
    CancelAppointmentRequest, CancelParty, CreateAppointmentRequest, DateRange, DayAvailability,
    QuickAction, SchedulingError, MAX_APPOINTMENT_MINUTES, MIN_APPOINTMENT_MINUTES,
};
use crate::services::availability::AvailabilityEngine;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::projection::CalendarProjector;
use crate::services::view_range::ViewRangeResolver;

/// The composed read/write surface behind the calendar UI: resolves the
/// fetch window, pulls raw appointments from the store, projects them into
/// events, and computes the requested day's availability in one pass.
/// Lifecycle mutations (quick actions, cancellation) also live here since
/// they follow the same fetch-decide-mutate shape.
pub struct CalendarQueryService {
    supabase: SupabaseClient,
    business_hours: BusinessHours,
    engine: AvailabilityEngine,
    projector: CalendarProjector,
    resolver: ViewRangeResolver,
    lifecycle: AppointmentLifecycleService,
}

impl CalendarQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            business_hours: config.business_hours.clone(),
            engine: AvailabilityEngine::new(),
            projector: CalendarProjector::new(),
            resolver: ViewRangeResolver::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Fetch raw appointments for a window, ascending by start time. No
    /// partial data: any transport or parse failure surfaces as
    /// `FetchFailed` and the caller keeps whatever it was showing.
    pub async fn fetch_appointments(
        &self,
        range: &DateRange,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut query_parts = vec![
            format!("date_time=gte.{}", range.start.to_rfc3339()),
            format!("date_time=lte.{}", range.end.to_rfc3339()),
        ];

        if let Some(staff_id) = filters.staff_id {
            query_parts.push(format!("staff_id=eq.{}", staff_id));
        }
        if let Some(pet_id) = filters.pet_id {
            query_parts.push(format!("pet_id=eq.{}", pet_id));
        }
        if let Some(customer_id) = filters.customer_id {
            query_parts.push(format!("customer_id=eq.{}", customer_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=date_time.asc",
            query_parts.join("&")
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::FetchFailed(e.to_string()))?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::FetchFailed(format!("Failed to parse appointments: {}", e)))
    }

    /// Build the full read surface for one view: projected events for the
    /// (buffered) fetch window plus slot availability for the reference day.
    pub async fn calendar_snapshot(
        &self,
        view: CalendarView,
        reference: NaiveDate,
        requested_duration: Option<i32>,
        staff_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<CalendarSnapshot, SchedulingError> {
        let range = self.resolver.resolve_fetch_window(view, reference);
        debug!(
            "Calendar snapshot for {:?} view around {}: fetching {} .. {}",
            view, reference, range.start, range.end
        );

        let filters = AppointmentFilters {
            staff_id,
            ..Default::default()
        };
        let appointments = self.fetch_appointments(&range, &filters, auth_token).await?;

        let events = self.projector.project(&appointments);

        // Availability sees only appointments that still occupy their slot.
        let booked: Vec<BookedInterval> = appointments
            .iter()
            .filter(|appointment| appointment.status.is_active())
            .map(BookedInterval::from)
            .collect();

        let duration =
            requested_duration.unwrap_or(self.business_hours.slot_duration_minutes);
        let availability = self.engine.compute_slots(
            reference,
            duration,
            &self.business_hours,
            &booked,
            None,
            staff_id,
        )?;

        Ok(CalendarSnapshot {
            range,
            events,
            slot_date: reference,
            available_slots: availability.slots,
            total_slots: availability.total_slots,
            available_count: availability.available_count,
            occupied_count: availability.occupied_count,
        })
    }

    /// Slot availability for a single day, independent of any calendar view.
    /// `exclude_appointment_id` lets an edit dialog treat the appointment
    /// being moved as absent from the booked set.
    pub async fn day_availability(
        &self,
        date: NaiveDate,
        requested_duration: Option<i32>,
        staff_id: Option<Uuid>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<DayAvailability, SchedulingError> {
        let range = self.resolver.resolve_range(CalendarView::Day, date);
        let appointments = self
            .fetch_appointments(&range, &AppointmentFilters::default(), auth_token)
            .await?;

        let booked: Vec<BookedInterval> = appointments
            .iter()
            .filter(|appointment| appointment.status.is_active())
            .map(BookedInterval::from)
            .collect();

        let duration =
            requested_duration.unwrap_or(self.business_hours.slot_duration_minutes);
        self.engine.compute_slots(
            date,
            duration,
            &self.business_hours,
            &booked,
            exclude_appointment_id,
            staff_id,
        )
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::FetchFailed(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(SchedulingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::FetchFailed(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if request.duration_minutes < MIN_APPOINTMENT_MINUTES
            || request.duration_minutes > MAX_APPOINTMENT_MINUTES
        {
            return Err(SchedulingError::ValidationError(format!(
                "Appointment duration must be between {} and {} minutes",
                MIN_APPOINTMENT_MINUTES, MAX_APPOINTMENT_MINUTES
            )));
        }

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "pet_id": request.pet_id,
            "customer_id": request.customer_id,
            "staff_id": request.staff_id,
            "date_time": request.date_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "reason": request.reason,
            "status": "scheduled",
            "location_id": request.location_id,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });

        let created = self.insert_appointment(body, auth_token).await?;
        info!("Appointment {} created for pet {}", created.id, created.pet_id);
        Ok(created)
    }

    /// Cancellation: lifecycle-gated, attributed to whoever initiated it.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        cancel_party: CancelParty,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if !self.lifecycle.can_cancel(&appointment.status) {
            return Err(SchedulingError::NotEditable(appointment.status));
        }

        let notes = match &appointment.notes {
            Some(existing) => format!("{}\nCancelled: {}", existing, request.reason),
            None => format!("Cancelled: {}", request.reason),
        };

        let updated = self
            .update_appointment(
                appointment_id,
                json!({
                    "status": cancel_party.cancelled_status(),
                    "notes": notes,
                }),
                auth_token,
            )
            .await?;

        info!(
            "Appointment {} cancelled by {:?}",
            appointment_id, cancel_party
        );
        Ok(updated)
    }

    /// Execute a quick action: fetch the current record, compute the
    /// transition client-side, and send the full target status. An invalid
    /// action aborts before any mutation is issued.
    pub async fn run_quick_action(
        &self,
        appointment_id: Uuid,
        action: QuickAction,
        notes: Option<String>,
        cancel_party: CancelParty,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        let new_status =
            self.lifecycle
                .apply_quick_action(&appointment.status, action, cancel_party)?;

        let mut changes = json!({ "status": new_status });
        if let Some(notes) = notes {
            changes["notes"] = json!(notes);
        }

        let updated = self
            .update_appointment(appointment_id, changes, auth_token)
            .await?;

        info!(
            "Quick action {} moved appointment {} from {} to {}",
            action, appointment_id, appointment.status, new_status
        );
        Ok(updated)
    }

    async fn insert_appointment(
        &self,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| SchedulingError::MutationFailed(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::MutationFailed("Insert returned no row".to_string()))?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::MutationFailed(format!("Failed to parse appointment: {}", e)))
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        mut changes: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        if let Some(map) = changes.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(changes), Some(headers))
            .await
            .map_err(|e| SchedulingError::MutationFailed(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or(SchedulingError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::MutationFailed(format!("Failed to parse appointment: {}", e)))
    }
}
