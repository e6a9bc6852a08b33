use axum::{
    routing::{delete, get},
    Router,
};

use cleanops_auth::AuthzError;

use crate::authz::{ops, Guards};

pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
///
/// Each route is wrapped in the guard for its operation at build time.
pub fn router(guards: &Guards) -> Result<Router, AuthzError> {
    Ok(Router::new()
        .route("/users/me", guards.protect(ops::USERS_ME, get(users::me))?)
        .route("/users", guards.protect(ops::USERS_LIST, get(users::list))?)
        .route("/users/:id", guards.protect(ops::USERS_READ, get(users::get_user))?)
        .route("/users/:id", guards.protect(ops::USERS_DELETE, delete(users::delete_user))?)
        .route("/supervisors", guards.protect(ops::SUPERVISORS_LIST, get(users::list_supervisors))?))
}
