use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{CreateScheduleRequest, ScheduleError, UpdateScheduleRequest};
use doctor_cell::services::schedule::ScheduleService;
use shared_utils::test_utils::{MockTableRows, TestConfig};

fn service_for(mock_server: &MockServer) -> ScheduleService {
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    ScheduleService::new(&config)
}

fn update_request(doctor_id: Uuid, date: &str) -> UpdateScheduleRequest {
    UpdateScheduleRequest {
        doctor_id,
        date: date.parse::<NaiveDate>().unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    }
}

/// No row on the requested day, no bookings: the target is updated in place.
#[tokio::test]
async fn update_moves_schedule_when_day_is_free() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let schedule_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", schedule_id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&schedule_id.to_string(), &doctor_id.to_string(), "2024-01-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2024-01-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", schedule_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&schedule_id.to_string(), &doctor_id.to_string(), "2024-01-15")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let updated = service
        .update_schedule(schedule_id, update_request(doctor_id, "2024-01-15"), "test-token")
        .await
        .expect("update should succeed");

    assert_eq!(updated.id, schedule_id);
    assert_eq!(updated.date, "2024-01-15".parse::<NaiveDate>().unwrap());
    assert!(updated.is_active());
}

/// A soft-deleted row already sits on the requested day: it is revived with
/// the new values and the original target is retired.
#[tokio::test]
async fn update_revives_soft_deleted_conflict() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let target_id = Uuid::new_v4();
    let dormant_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", target_id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&target_id.to_string(), &doctor_id.to_string(), "2024-01-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2024-01-15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::deleted_schedule(
                &dormant_id.to_string(),
                &doctor_id.to_string(),
                "2024-01-15",
                "2023-12-01T00:00:00Z"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The dormant row comes back alive with the requested values...
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", dormant_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&dormant_id.to_string(), &doctor_id.to_string(), "2024-01-15")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // ...and the original target is soft-deleted.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", target_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::deleted_schedule(
                &target_id.to_string(),
                &doctor_id.to_string(),
                "2024-01-10",
                "2024-06-01T12:00:00Z"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let revived = service
        .update_schedule(target_id, update_request(doctor_id, "2024-01-15"), "test-token")
        .await
        .expect("revival should succeed");

    assert_eq!(revived.id, dormant_id);
    assert_eq!(revived.date, "2024-01-15".parse::<NaiveDate>().unwrap());
    assert!(revived.deleted_at.is_none());
}

/// Booked appointments on the requested day block the change outright,
/// whatever the schedule table looks like.
#[tokio::test]
async fn update_blocked_by_existing_bookings() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let schedule_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", schedule_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&schedule_id.to_string(), &doctor_id.to_string(), "2024-01-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2024-01-15"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::appointment(
                &Uuid::new_v4().to_string(),
                &patient_id.to_string(),
                &doctor_id.to_string(),
                "2024-01-15",
                "10:00:00"
            )
        ])))
        .mount(&mock_server)
        .await;

    // Nothing may be mutated on this path.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .update_schedule(schedule_id, update_request(doctor_id, "2024-01-15"), "test-token")
        .await;

    assert_matches!(result, Err(ScheduleError::BookingsExist));
}

/// An active row already on the requested day rejects the change.
#[tokio::test]
async fn update_rejects_active_conflict() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let schedule_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", schedule_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&schedule_id.to_string(), &doctor_id.to_string(), "2024-01-10")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&other_id.to_string(), &doctor_id.to_string(), "2024-01-15")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .update_schedule(schedule_id, update_request(doctor_id, "2024-01-15"), "test-token")
        .await;

    assert_matches!(result, Err(ScheduleError::DateTaken));
}

#[tokio::test]
async fn update_missing_schedule_is_not_found() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .update_schedule(Uuid::new_v4(), update_request(doctor_id, "2024-01-15"), "test-token")
        .await;

    assert_matches!(result, Err(ScheduleError::NotFound));
}

/// Creating over a soft-deleted day reuses the dormant row instead of
/// inserting a duplicate.
#[tokio::test]
async fn create_revives_soft_deleted_day() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let dormant_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::doctor(
                &doctor_id.to_string(),
                &Uuid::new_v4().to_string(),
                "Grace",
                "Hopper"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::deleted_schedule(
                &dormant_id.to_string(),
                &doctor_id.to_string(),
                "2024-03-01",
                "2023-12-01T00:00:00Z"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("id", format!("eq.{}", dormant_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&dormant_id.to_string(), &doctor_id.to_string(), "2024-03-01")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No insert happens on the revival path.
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let request = CreateScheduleRequest {
        doctor_id,
        date: "2024-03-01".parse::<NaiveDate>().unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    };

    let schedule = service
        .create_schedule(request, "test-token")
        .await
        .expect("create should revive the dormant row");

    assert_eq!(schedule.id, dormant_id);
    assert!(schedule.deleted_at.is_none());
}
