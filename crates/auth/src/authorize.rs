use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::{OperationId, Role, VerifiedIdentity};

/// Roles allowed to run an operation.
///
/// An empty set means "any authenticated identity"; it never means
/// "no authentication needed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    roles: BTreeSet<Role>,
}

impl AuthorizationPolicy {
    /// Any authenticated identity.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn required_roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no authenticated identity")]
    Unauthenticated,

    #[error("forbidden: insufficient role")]
    Forbidden { role: Role },

    #[error("no policy registered for operation '{0}'")]
    UnknownOperation(OperationId),
}

/// Decide whether `identity` may run an operation guarded by `policy`.
///
/// - No IO
/// - No panics
/// - Exact role membership (no hierarchy)
pub fn authorize(identity: Option<&VerifiedIdentity>, policy: &AuthorizationPolicy) -> Result<(), AuthzError> {
    let Some(identity) = identity else {
        return Err(AuthzError::Unauthenticated);
    };

    if policy.roles.is_empty() || policy.roles.contains(&identity.role()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { role: identity.role() })
    }
}

/// Operation-to-policy lookup, filled when routes are registered.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<OperationId, AuthorizationPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, operation: OperationId, policy: AuthorizationPolicy) -> Self {
        self.policies.insert(operation, policy);
        self
    }

    /// Look up the policy for an operation.
    ///
    /// Unknown operations are an error (fail closed) rather than unrestricted.
    pub fn resolve(&self, operation: &OperationId) -> Result<&AuthorizationPolicy, AuthzError> {
        self.policies
            .get(operation)
            .ok_or_else(|| AuthzError::UnknownOperation(operation.clone()))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Explanation of an authorization decision, for logs and debugging.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub granted: bool,
    pub reason: String,
    pub required_roles: Vec<Role>,
    pub actual_role: Option<Role>,
    pub denial_kind: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    MissingRole,
}

/// Explain why [`authorize`] would allow or deny.
pub fn explain_authorization(
    identity: Option<&VerifiedIdentity>,
    policy: &AuthorizationPolicy,
) -> AuthorizationExplanation {
    let required_roles: Vec<Role> = policy.roles.iter().copied().collect();
    let actual_role = identity.map(|i| i.role());

    let (granted, reason, denial_kind) = match (identity, authorize(identity, policy)) {
        (Some(_), Ok(())) if policy.is_unrestricted() => (
            true,
            "Policy requires authentication only".to_string(),
            None,
        ),
        (Some(identity), Ok(())) => (
            true,
            format!("Role '{}' is in the required set", identity.role()),
            None,
        ),
        (_, Err(AuthzError::Forbidden { role })) => (
            false,
            format!("Role '{}' is not in the required set {:?}", role, required_roles),
            Some(DenialKind::MissingRole),
        ),
        (None, _) | (_, Err(_)) => (
            false,
            "No authenticated identity".to_string(),
            Some(DenialKind::Unauthenticated),
        ),
    };

    AuthorizationExplanation {
        granted,
        reason,
        required_roles,
        actual_role,
        denial_kind,
    }
}
