use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::models::{AppointmentConfirmation, NotificationError};
use notification_cell::services::dispatch::NotificationDispatcher;
use notification_cell::services::mailer::{confirmation_email, Mailer};
use shared_utils::test_utils::TestConfig;

fn confirmation() -> AppointmentConfirmation {
    AppointmentConfirmation {
        patient_first_name: "Ada".to_string(),
        patient_last_name: "Lovelace".to_string(),
        patient_email: "ada@example.com".to_string(),
        doctor_title: "Dr.".to_string(),
        doctor_first_name: "Grace".to_string(),
        doctor_last_name: "Hopper".to_string(),
        branch_name: "Cardiology".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
    }
}

fn config_with_mail_api(url: &str) -> shared_config::AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.mail_api_url = url.to_string();
    config
}

#[tokio::test]
async fn send_posts_message_to_mail_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("Authorization", "Bearer test-mail-key"))
        .and(body_partial_json(json!({
            "to": "ada@example.com",
            "subject": "Appointment confirmation"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = config_with_mail_api(&mock_server.uri());
    let mailer = Mailer::new(&config).expect("mailer");

    mailer
        .send(&confirmation_email(&confirmation()))
        .await
        .expect("send should succeed");
}

#[tokio::test]
async fn send_surfaces_mail_api_rejection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid recipient"))
        .mount(&mock_server)
        .await;

    let config = config_with_mail_api(&mock_server.uri());
    let mailer = Mailer::new(&config).expect("mailer");

    let result = mailer.send(&confirmation_email(&confirmation())).await;

    match result {
        Err(NotificationError::Api { status, .. }) => assert_eq!(status, 422),
        other => panic!("expected Api error, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn inline_delivery_reports_outcome() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_2"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = config_with_mail_api(&mock_server.uri());
    let dispatcher = NotificationDispatcher::new(&config);

    dispatcher
        .send_confirmation(&confirmation())
        .await
        .expect("inline delivery should succeed");
}
