//! API-side authorization wiring.
//!
//! Every protected route is registered under an operation id; the policy for
//! that id is looked up here once, when the router is built, rather than being
//! discovered per request.

use axum::routing::MethodRouter;

use cleanops_auth::{AuthenticationGuard, AuthorizationPolicy, AuthzError, OperationId, PolicyTable, Role};

use crate::middleware::{guard_middleware, RouteGuard};

pub mod ops {
    use cleanops_auth::OperationId;

    pub const USERS_ME: OperationId = OperationId::from_static("users.me");
    pub const USERS_LIST: OperationId = OperationId::from_static("users.list");
    pub const USERS_READ: OperationId = OperationId::from_static("users.read");
    pub const USERS_DELETE: OperationId = OperationId::from_static("users.delete");
    pub const SUPERVISORS_LIST: OperationId = OperationId::from_static("supervisors.list");
}

/// The policy for every protected operation the API exposes.
pub fn default_policies() -> PolicyTable {
    PolicyTable::new()
        .register(ops::USERS_ME, AuthorizationPolicy::authenticated())
        .register(ops::USERS_LIST, AuthorizationPolicy::roles([Role::Admin]))
        // Ownership (admin or self) is checked in the handler.
        .register(ops::USERS_READ, AuthorizationPolicy::authenticated())
        .register(ops::USERS_DELETE, AuthorizationPolicy::roles([Role::Admin]))
        .register(
            ops::SUPERVISORS_LIST,
            AuthorizationPolicy::roles([Role::Admin, Role::Supervisor]),
        )
}

/// Builds guarded method routers from a policy table.
#[derive(Clone)]
pub struct Guards {
    authn: AuthenticationGuard,
    policies: PolicyTable,
}

impl Guards {
    pub fn new(authn: AuthenticationGuard, policies: PolicyTable) -> Self {
        Self { authn, policies }
    }

    /// Wrap `route` in the guard pipeline for `operation`.
    ///
    /// Fails if the operation has no registered policy.
    pub fn protect(&self, operation: OperationId, route: MethodRouter) -> Result<MethodRouter, AuthzError> {
        let policy = self.policies.resolve(&operation)?.clone();
        let guard = RouteGuard {
            authn: self.authn.clone(),
            operation,
            policy,
        };
        Ok(route.route_layer(axum::middleware::from_fn_with_state(guard, guard_middleware)))
    }
}
