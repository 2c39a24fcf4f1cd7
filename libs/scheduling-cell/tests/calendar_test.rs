// libs/scheduling-cell/tests/calendar_test.rs
//
// Composed-provider tests against a wiremock double of the persistence API.
use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{
    AppointmentStatus, CalendarView, CancelAppointmentRequest, CancelParty,
    CreateAppointmentRequest, QuickAction, SchedulingError,
};
use scheduling_cell::services::calendar::CalendarQueryService;
use shared_config::{AppConfig, BusinessHours};

const AUTH_TOKEN: &str = "test_token";

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        supabase_url: base_url.to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        business_hours: BusinessHours::default(),
    }
}

fn appointment_row(id: Uuid, start: &str, duration: i32, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "pet_id": Uuid::new_v4(),
        "customer_id": Uuid::new_v4(),
        "staff_id": null,
        "date_time": start,
        "duration_minutes": duration,
        "reason": "Consulta general",
        "status": status,
        "location_id": null,
        "notes": null,
        "created_at": "2025-06-01T10:00:00Z",
        "updated_at": "2025-06-01T10:00:00Z"
    })
}

fn monday() -> NaiveDate {
    "2025-06-16".parse().unwrap()
}

#[tokio::test]
async fn snapshot_projects_events_and_computes_availability() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    // One live booking at 09:00 and one client-cancelled at 10:00.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_row(Uuid::new_v4(), "2025-06-16T09:00:00Z", 30, "scheduled"),
            appointment_row(Uuid::new_v4(), "2025-06-16T10:00:00Z", 30, "cancelled_client"),
        ]))
        .mount(&server)
        .await;

    let snapshot = service
        .calendar_snapshot(CalendarView::Month, monday(), Some(30), None, AUTH_TOKEN)
        .await
        .unwrap();

    // Every fetched appointment projects, cancelled ones included.
    assert_eq!(snapshot.events.len(), 2);
    assert_eq!(snapshot.slot_date, monday());
    assert_eq!(
        snapshot.total_slots,
        snapshot.available_count + snapshot.occupied_count
    );

    let times: Vec<&str> = snapshot
        .available_slots
        .iter()
        .map(|slot| slot.display_time.as_str())
        .collect();
    // The live booking occupies its interval...
    assert!(!times.contains(&"09:00"));
    // ...the cancelled one no longer blocks anything.
    assert!(times.contains(&"10:00"));
}

#[tokio::test]
async fn snapshot_surfaces_fetch_failures_without_partial_data() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;

    let result = service
        .calendar_snapshot(CalendarView::Week, monday(), None, None, AUTH_TOKEN)
        .await;

    assert_matches!(result, Err(SchedulingError::FetchFailed(_)));
}

#[tokio::test]
async fn day_availability_counts_only_active_bookings() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_row(Uuid::new_v4(), "2025-06-16T09:00:00Z", 30, "confirmed"),
            appointment_row(Uuid::new_v4(), "2025-06-16T11:00:00Z", 30, "no_show"),
        ]))
        .mount(&server)
        .await;

    let availability = service
        .day_availability(monday(), Some(30), None, None, AUTH_TOKEN)
        .await
        .unwrap();

    let times: Vec<&str> = availability
        .slots
        .iter()
        .map(|slot| slot.display_time.as_str())
        .collect();
    assert!(!times.contains(&"09:00"));
    assert!(times.contains(&"11:00"));
    assert_eq!(
        availability.total_slots,
        availability.available_count + availability.occupied_count
    );
}

#[tokio::test]
async fn missing_appointment_is_not_found() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&server)
        .await;

    let result = service.get_appointment(Uuid::new_v4(), AUTH_TOKEN).await;
    assert_matches!(result, Err(SchedulingError::NotFound));
}

#[tokio::test]
async fn quick_action_confirm_updates_the_record() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "scheduled",
        )]))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "confirmed",
        )]))
        .expect(1)
        .mount(&server)
        .await;

    let updated = service
        .run_quick_action(id, QuickAction::Confirm, None, CancelParty::Clinic, AUTH_TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn invalid_quick_action_issues_no_mutation() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "completed",
        )]))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = service
        .run_quick_action(id, QuickAction::Confirm, None, CancelParty::Clinic, AUTH_TOKEN)
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::InvalidTransition {
            from: AppointmentStatus::Completed,
            action: QuickAction::Confirm,
        })
    );
}

#[tokio::test]
async fn cancel_resolves_to_the_initiating_party_state() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "confirmed",
        )]))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "cancelled_clinic",
        )]))
        .mount(&server)
        .await;

    let updated = service
        .cancel_appointment(
            id,
            CancelAppointmentRequest {
                reason: "Vet unavailable".to_string(),
            },
            CancelParty::Clinic,
            AUTH_TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::CancelledClinic);
}

#[tokio::test]
async fn cancelling_a_terminal_appointment_is_rejected() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "no_show",
        )]))
        .mount(&server)
        .await;

    let result = service
        .cancel_appointment(
            id,
            CancelAppointmentRequest {
                reason: "too late".to_string(),
            },
            CancelParty::Client,
            AUTH_TOKEN,
        )
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::NotEditable(AppointmentStatus::NoShow))
    );
}

#[tokio::test]
async fn create_rejects_out_of_range_durations_locally() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let request = CreateAppointmentRequest {
        pet_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        staff_id: None,
        date_time: "2025-06-16T09:00:00Z".parse().unwrap(),
        duration_minutes: 10,
        reason: "Vacuna".to_string(),
        location_id: None,
        notes: None,
    };

    let result = service.create_appointment(request, AUTH_TOKEN).await;
    assert_matches!(result, Err(SchedulingError::ValidationError(_)));
}

#[tokio::test]
async fn create_posts_and_returns_the_stored_row() {
    let server = MockServer::start().await;
    let service = CalendarQueryService::new(&test_config(&server.uri()));

    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![appointment_row(
            id,
            "2025-06-16T09:00:00Z",
            30,
            "scheduled",
        )]))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateAppointmentRequest {
        pet_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        staff_id: None,
        date_time: "2025-06-16T09:00:00Z".parse().unwrap(),
        duration_minutes: 30,
        reason: "Consulta general".to_string(),
        location_id: None,
        notes: None,
    };

    let created = service.create_appointment(request, AUTH_TOKEN).await.unwrap();
    assert_eq!(created.id, id);
    assert_eq!(created.status, AppointmentStatus::Scheduled);
}
