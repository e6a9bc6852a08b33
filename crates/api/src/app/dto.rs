//! Response DTOs.

use serde::Serialize;

use cleanops_auth::{Role, UserRecord};

use crate::context::IdentityContext;

/// `GET /users/me`: the caller as seen by the guard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub username: String,
}

impl From<&IdentityContext> for IdentityResponse {
    fn from(ctx: &IdentityContext) -> Self {
        let identity = ctx.identity();
        Self {
            user_id: identity.user_id().to_string(),
            email: identity.email().to_string(),
            role: identity.role(),
            username: identity.username().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
}
