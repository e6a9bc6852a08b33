use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use cleanops_auth::DirectoryError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 with the uniform message; the specific reason stays in the logs.
pub fn unauthenticated(message: &'static str) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message)
}

/// 403: authenticated, but not allowed.
pub fn forbidden(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    match err {
        DirectoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        DirectoryError::Unavailable(msg) => {
            tracing::error!(error = %msg, "user directory unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "directory_unavailable",
                "user directory unavailable",
            )
        }
    }
}
