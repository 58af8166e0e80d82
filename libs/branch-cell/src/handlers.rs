use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BranchError, CreateBranchRequest, UpdateBranchRequest};
use crate::services::branch::BranchService;

#[derive(Debug, Deserialize)]
pub struct BranchListQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_branches(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<BranchListQuery>,
) -> Result<Json<Value>, AppError> {
    let branch_service = BranchService::new(&state);

    let branches = branch_service
        .list_branches(query.limit, query.offset, None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "branches": branches,
        "total": branches.len()
    })))
}

#[axum::debug_handler]
pub async fn get_branch(
    State(state): State<Arc<AppConfig>>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let branch_service = BranchService::new(&state);

    let branch = branch_service
        .get_branch(branch_id, None)
        .await
        .map_err(|e| match e {
            BranchError::NotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!(branch)))
}

#[axum::debug_handler]
pub async fn get_branch_by_name(
    State(state): State<Arc<AppConfig>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let branch_service = BranchService::new(&state);

    let branch = branch_service
        .get_branch_by_name(&name, None)
        .await
        .map_err(|e| match e {
            BranchError::NotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!(branch)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_branch(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBranchRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage branches".to_string()));
    }

    let branch_service = BranchService::new(&state);

    let branch = branch_service
        .create_branch(request, auth.token())
        .await
        .map_err(|e| match e {
            BranchError::NameTaken(name) => {
                AppError::Conflict(format!("A branch named '{}' already exists", name))
            }
            BranchError::NotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "branch": branch
    })))
}

#[axum::debug_handler]
pub async fn update_branch(
    State(state): State<Arc<AppConfig>>,
    Path(branch_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateBranchRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage branches".to_string()));
    }

    let branch_service = BranchService::new(&state);

    let branch = branch_service
        .update_branch(branch_id, request, auth.token())
        .await
        .map_err(|e| match e {
            BranchError::NotFound => AppError::NotFound("Branch not found".to_string()),
            BranchError::NameTaken(name) => {
                AppError::Conflict(format!("A branch named '{}' already exists", name))
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "branch": branch
    })))
}

#[axum::debug_handler]
pub async fn delete_branch(
    State(state): State<Arc<AppConfig>>,
    Path(branch_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only administrators can manage branches".to_string()));
    }

    let branch_service = BranchService::new(&state);

    let branch = branch_service
        .delete_branch(branch_id, auth.token())
        .await
        .map_err(|e| match e {
            BranchError::NotFound => AppError::NotFound("Branch not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "branch": branch,
        "message": "Branch deleted"
    })))
}
