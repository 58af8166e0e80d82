use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{BookingError, CreateAppointmentRequest};
use appointment_cell::services::booking::BookingService;
use patient_cell::services::identity::IdentityCipher;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockTableRows, TestConfig};

struct Ids {
    doctor: Uuid,
    patient: Uuid,
    branch: Uuid,
}

fn test_config(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    // Point the mail leg at the mock server as well so dispatched
    // confirmations have somewhere to land.
    config.mail_api_url = mock_server.uri();
    config
}

fn booking_request(ids: &Ids, time: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        date: "2024-02-01".parse::<NaiveDate>().unwrap(),
        time: time.parse::<NaiveTime>().unwrap(),
        status: true,
        doctor_id: ids.doctor,
        patient_id: ids.patient,
    }
}

/// Mount the aggregate lookups every booking makes: doctor, branch, patient,
/// and the doctor's working hours for the day.
async fn mount_aggregates(mock_server: &MockServer, config: &AppConfig, ids: &Ids) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", ids.doctor)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::doctor(&ids.doctor.to_string(), &ids.branch.to_string(), "Grace", "Hopper")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/branches"))
        .and(query_param("id", format!("eq.{}", ids.branch)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::branch(&ids.branch.to_string(), "Cardiology")
        ])))
        .mount(mock_server)
        .await;

    let cipher = IdentityCipher::from_config(config).unwrap();
    let mut patient_row =
        MockTableRows::patient(&ids.patient.to_string(), "ada@example.com", "Ada", "Lovelace");
    patient_row["national_identity"] = json!(cipher.encrypt("29876543210").unwrap());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", ids.patient)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_row])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .and(query_param("doctor_id", format!("eq.{}", ids.doctor)))
        .and(query_param("date", "eq.2024-02-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::schedule(&Uuid::new_v4().to_string(), &ids.doctor.to_string(), "2024-02-01")
        ])))
        .mount(mock_server)
        .await;

    // Dispatched confirmation emails land here.
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg"})))
        .mount(mock_server)
        .await;
}

/// A cancelled row for the same triple is revived instead of inserting a
/// duplicate.
#[tokio::test]
async fn booking_revives_cancelled_appointment() {
    let mock_server = MockServer::start().await;
    let ids = Ids {
        doctor: Uuid::new_v4(),
        patient: Uuid::new_v4(),
        branch: Uuid::new_v4(),
    };
    let dormant_id = Uuid::new_v4();

    let config = test_config(&mock_server);
    mount_aggregates(&mock_server, &config, &ids).await;

    // No active booking for the triple...
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // ...but a cancelled one sits on the same day.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("deleted_at", "not.is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::deleted_appointment(
                &dormant_id.to_string(),
                &ids.patient.to_string(),
                &ids.doctor.to_string(),
                "2024-02-01",
                "2023-11-01T00:00:00Z"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", dormant_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::appointment(
                &dormant_id.to_string(),
                &ids.patient.to_string(),
                &ids.doctor.to_string(),
                "2024-02-01",
                "14:00:00"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The revival path must not insert.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config).unwrap();
    let details = service
        .create_appointment(booking_request(&ids, "14:00:00"), "test-token")
        .await
        .expect("booking should revive the cancelled row");

    assert_eq!(details.appointment.id, dormant_id);
    assert_eq!(details.appointment.time, "14:00:00".parse::<NaiveTime>().unwrap());
    assert!(details.appointment.deleted_at.is_none());
    assert_eq!(details.branch.name, "Cardiology");
    assert_eq!(details.patient.national_identity, "29876543210");
}

#[tokio::test]
async fn booking_inserts_fresh_appointment() {
    let mock_server = MockServer::start().await;
    let ids = Ids {
        doctor: Uuid::new_v4(),
        patient: Uuid::new_v4(),
        branch: Uuid::new_v4(),
    };

    let config = test_config(&mock_server);
    mount_aggregates(&mock_server, &config, &ids).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockTableRows::appointment(
                &Uuid::new_v4().to_string(),
                &ids.patient.to_string(),
                &ids.doctor.to_string(),
                "2024-02-01",
                "10:30:00"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config).unwrap();
    let details = service
        .create_appointment(booking_request(&ids, "10:30:00"), "test-token")
        .await
        .expect("booking should insert a new row");

    assert!(details.appointment.status);
    assert!(details.appointment.is_active());
}

#[tokio::test]
async fn booking_rejects_double_booking() {
    let mock_server = MockServer::start().await;
    let ids = Ids {
        doctor: Uuid::new_v4(),
        patient: Uuid::new_v4(),
        branch: Uuid::new_v4(),
    };

    let config = test_config(&mock_server);
    mount_aggregates(&mock_server, &config, &ids).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::appointment(
                &Uuid::new_v4().to_string(),
                &ids.patient.to_string(),
                &ids.doctor.to_string(),
                "2024-02-01",
                "09:30:00"
            )
        ])))
        .mount(&mock_server)
        .await;

    // No writes on the rejection path.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = BookingService::new(&config).unwrap();
    let result = service
        .create_appointment(booking_request(&ids, "14:00:00"), "test-token")
        .await;

    assert_matches!(result, Err(BookingError::AlreadyBooked));
}

#[tokio::test]
async fn booking_outside_working_hours_is_rejected() {
    let mock_server = MockServer::start().await;
    let ids = Ids {
        doctor: Uuid::new_v4(),
        patient: Uuid::new_v4(),
        branch: Uuid::new_v4(),
    };

    let config = test_config(&mock_server);
    mount_aggregates(&mock_server, &config, &ids).await;

    let service = BookingService::new(&config).unwrap();

    // The mounted schedule runs 09:00-17:00; 18:30 falls outside it.
    let result = service
        .create_appointment(booking_request(&ids, "18:30:00"), "test-token")
        .await;

    assert_matches!(result, Err(BookingError::OutsideScheduleHours));
}

#[tokio::test]
async fn booking_for_unknown_doctor_is_not_found() {
    let mock_server = MockServer::start().await;
    let ids = Ids {
        doctor: Uuid::new_v4(),
        patient: Uuid::new_v4(),
        branch: Uuid::new_v4(),
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let service = BookingService::new(&config).unwrap();

    let result = service
        .create_appointment(booking_request(&ids, "10:00:00"), "test-token")
        .await;

    assert_matches!(result, Err(BookingError::DoctorNotFound));
}
