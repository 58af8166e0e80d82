use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn report_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_report))
        .route("/", get(handlers::list_reports))
        .route("/{report_id}", get(handlers::get_report))
        .route("/{report_id}", put(handlers::update_report))
        .route("/{report_id}", delete(handlers::delete_report))
        .route("/by-doctor/{doctor_id}", get(handlers::list_reports_by_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
