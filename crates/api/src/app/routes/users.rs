use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use cleanops_auth::{DirectoryError, Role};
use cleanops_core::UserId;

use crate::app::dto::{IdentityResponse, UserListResponse};
use crate::app::{errors, AppServices};
use crate::context::IdentityContext;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

/// GET /users/me
pub async fn me(Extension(ctx): Extension<IdentityContext>) -> impl IntoResponse {
    Json(IdentityResponse::from(&ctx))
}

/// GET /users (admin)
pub async fn list(
    Extension(services): Extension<AppServices>,
    Query(query): Query<ListUsersQuery>,
) -> axum::response::Response {
    match services.directory.list(query.role).await {
        Ok(users) => (StatusCode::OK, Json(UserListResponse { users })).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// GET /supervisors (admin, supervisor)
pub async fn list_supervisors(Extension(services): Extension<AppServices>) -> axum::response::Response {
    match services.directory.list(Some(Role::Supervisor)).await {
        Ok(users) => (StatusCode::OK, Json(UserListResponse { users })).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// GET /users/:id (admin or self)
pub async fn get_user(
    Extension(services): Extension<AppServices>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if !ctx.is_self_or_admin(&id) {
        tracing::warn!(target_user = %id, user_id = %ctx.user_id(), "forbidden attempt to read another user");
        return errors::forbidden("forbidden");
    }

    match services.directory.find_by_id(&id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => errors::directory_error_to_response(DirectoryError::NotFound),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// DELETE /users/:id (admin, never oneself)
pub async fn delete_user(
    Extension(services): Extension<AppServices>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if ctx.user_id() == &id {
        return errors::forbidden("admin cannot delete their own account");
    }

    match services.directory.remove(&id).await {
        Ok(()) => {
            tracing::info!(target_user = %id, user_id = %ctx.user_id(), "user deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::directory_error_to_response(e),
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse()
        .map_err(|e: cleanops_core::DomainError| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}
