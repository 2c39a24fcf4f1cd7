// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CalendarView, CancelAppointmentRequest, CancelParty, CreateAppointmentRequest,
    MoveAppointmentRequest, QuickActionRequest, RescheduleOutcome, ResizeAppointmentRequest,
    SchedulingError,
};
use crate::services::calendar::CalendarQueryService;
use crate::services::projection::CalendarProjector;
use crate::services::reschedule::RescheduleCoordinator;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CalendarQueryParams {
    /// Textual view name; anything unrecognized falls back to month.
    pub view: Option<String>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQueryParams {
    pub date: NaiveDate,
    pub duration_minutes: Option<i32>,
    pub staff_id: Option<Uuid>,
    pub exclude_appointment_id: Option<Uuid>,
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<CalendarQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);

    let view = CalendarView::parse(params.view.as_deref().unwrap_or("month"));
    let reference = params.date.unwrap_or_else(|| Utc::now().date_naive());

    let snapshot = service
        .calendar_snapshot(
            view,
            reference,
            params.duration_minutes,
            params.staff_id,
            token,
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "calendar": snapshot
    })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<AvailabilityQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);

    let availability = service
        .day_availability(
            params.date,
            params.duration_minutes,
            params.staff_id,
            params.exclude_appointment_id,
            token,
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "date": params.date,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_scheduling_error)?;

    let event = CalendarProjector::new().project_one(&appointment);

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "event": event
    })))
}

// ==============================================================================
// MUTATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Customers may only book for themselves; clinic staff may book for anyone.
    let is_owner = request.customer_id.to_string() == user.id;
    if !is_owner && !user.is_clinic_staff() {
        return Err(AppError::Auth(
            "Not authorized to book appointments for this customer".to_string(),
        ));
    }

    let service = CalendarQueryService::new(&state);
    let appointment = service
        .create_appointment(request, token)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

/// Drag-to-reschedule. Always answers 200 with a settled outcome: a revert
/// is a valid result the client pattern-matches on, not a transport error.
#[axum::debug_handler]
pub async fn move_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<MoveAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);
    let coordinator = RescheduleCoordinator::new(&state);

    let appointment = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_scheduling_error)?;

    let outcome = coordinator
        .move_appointment(&appointment, request.new_start, token)
        .await;

    Ok(Json(outcome_body(outcome)))
}

/// Resize-to-redurate; same settled-outcome contract as `move_appointment`.
#[axum::debug_handler]
pub async fn resize_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ResizeAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);
    let coordinator = RescheduleCoordinator::new(&state);

    let appointment = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_scheduling_error)?;

    let outcome = coordinator
        .resize_appointment(&appointment, request.new_end, token)
        .await;

    Ok(Json(outcome_body(outcome)))
}

#[axum::debug_handler]
pub async fn run_quick_action(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<QuickActionRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);

    let appointment = service
        .run_quick_action(
            appointment_id,
            request.action,
            request.notes,
            cancel_party_for(&user),
            token,
        )
        .await
        .map_err(map_scheduling_error)?;

    let event = CalendarProjector::new().project_one(&appointment);

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "event": event
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = CalendarQueryService::new(&state);

    let appointment = service
        .cancel_appointment(appointment_id, request, cancel_party_for(&user), token)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// HELPERS
// ==============================================================================

/// Cancellations are attributed by who asked: clinic-side roles resolve to
/// the clinic cancellation state, customer sessions to the client one.
fn cancel_party_for(user: &User) -> CancelParty {
    if user.is_clinic_staff() {
        CancelParty::Clinic
    } else {
        CancelParty::Client
    }
}

fn outcome_body(outcome: RescheduleOutcome) -> Value {
    match outcome {
        RescheduleOutcome::Applied(appointment) => {
            let event = CalendarProjector::new().project_one(&appointment);
            json!({
                "success": true,
                "applied": true,
                "appointment": appointment,
                "event": event
            })
        }
        RescheduleOutcome::Reverted(reason) => json!({
            "success": true,
            "applied": false,
            "revert": reason
        }),
    }
}

fn map_scheduling_error(error: SchedulingError) -> AppError {
    match error {
        SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SchedulingError::NotEditable(status) => AppError::Conflict(format!(
            "Appointment cannot be modified in status {}",
            status
        )),
        SchedulingError::DurationOutOfRange(minutes) => AppError::BadRequest(format!(
            "Appointment duration {} minutes is outside the allowed range",
            minutes
        )),
        SchedulingError::InvalidTransition { from, action } => AppError::BadRequest(format!(
            "Action {} is not valid from status {}",
            action, from
        )),
        SchedulingError::ValidationError(msg) => AppError::ValidationError(msg),
        SchedulingError::InvalidConfiguration(msg) => AppError::Internal(msg),
        SchedulingError::FetchFailed(msg) => AppError::Upstream(msg),
        SchedulingError::MutationFailed(msg) => AppError::Upstream(msg),
    }
}
