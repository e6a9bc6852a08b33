use cleanops_auth::{Role, VerifiedIdentity};
use cleanops_core::UserId;

/// Identity context for a request (set by the guard middleware).
///
/// This is immutable and present on every protected route; handlers read the
/// caller's identity only through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: VerifiedIdentity,
}

impl IdentityContext {
    pub fn new(identity: VerifiedIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }

    pub fn user_id(&self) -> &UserId {
        self.identity.user_id()
    }

    pub fn role(&self) -> Role {
        self.identity.role()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.role() == Role::Admin
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn is_self_or_admin(&self, target: &UserId) -> bool {
        self.is_admin() || self.identity.user_id() == target
    }
}
