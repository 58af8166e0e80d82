use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use branch_cell::models::{BranchError, CreateBranchRequest};
use branch_cell::services::branch::BranchService;
use shared_utils::test_utils::{MockTableRows, TestConfig};

fn service_for(mock_server: &MockServer) -> BranchService {
    let config = TestConfig::with_database_url(&mock_server.uri()).to_app_config();
    BranchService::new(&config)
}

#[tokio::test]
async fn create_branch_inserts_new_row() {
    let mock_server = MockServer::start().await;
    let branch_id = Uuid::new_v4().to_string();

    // No active branch holds the name yet.
    Mock::given(method("GET"))
        .and(path("/rest/v1/branches"))
        .and(query_param("name", "eq.Cardiology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/branches"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockTableRows::branch(&branch_id, "Cardiology")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let branch = service
        .create_branch(
            CreateBranchRequest {
                name: "Cardiology".to_string(),
            },
            "test-token",
        )
        .await
        .expect("create should succeed");

    assert_eq!(branch.name, "Cardiology");
    assert!(branch.is_active());
}

#[tokio::test]
async fn create_branch_rejects_duplicate_active_name() {
    let mock_server = MockServer::start().await;
    let existing_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/branches"))
        .and(query_param("name", "eq.Cardiology"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockTableRows::branch(&existing_id, "Cardiology")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service
        .create_branch(
            CreateBranchRequest {
                name: "Cardiology".to_string(),
            },
            "test-token",
        )
        .await;

    assert_matches!(result, Err(BranchError::NameTaken(_)));
}

#[tokio::test]
async fn get_branch_returns_not_found_for_missing_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server);
    let result = service.get_branch(Uuid::new_v4(), None).await;

    assert_matches!(result, Err(BranchError::NotFound));
}
