//! Authentication guard: raw token in, verified identity (or rejection) out.
//!
//! Per request the guard moves `Unauthenticated -> Verifying -> Authenticated | Rejected`.
//! The result is returned as a value; nothing is stashed in shared state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{TokenError, TokenVerifier, VerifiedIdentity};

/// Message shown to clients for every authentication failure.
pub const AUTHENTICATION_REQUIRED: &str = "authentication required";

/// Internal reason for a rejection. Logged, never returned to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("no credential supplied")]
    MissingCredential,

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: RejectionReason,
}

impl Rejection {
    pub fn reason(&self) -> &RejectionReason {
        &self.reason
    }

    /// Uniform client-facing message; does not reveal which check failed.
    pub fn client_message(&self) -> &'static str {
        AUTHENTICATION_REQUIRED
    }
}

/// Terminal state of the guard for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Authenticated(VerifiedIdentity),
    Rejected(Rejection),
}

impl Authentication {
    /// The identity, if authentication succeeded.
    ///
    /// This is what the authorization guard receives; a rejection yields `None`,
    /// which authorization always denies.
    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        match self {
            Authentication::Authenticated(identity) => Some(identity),
            Authentication::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<VerifiedIdentity, Rejection> {
        match self {
            Authentication::Authenticated(identity) => Ok(identity),
            Authentication::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Runs the authentication stage of the guard pipeline.
#[derive(Clone)]
pub struct AuthenticationGuard {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthenticationGuard {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Authenticate a request given the token extracted from it (if any).
    ///
    /// An empty token counts as missing. The token is verified exactly as
    /// given; extraction is responsible for stripping transport framing.
    pub fn authenticate(&self, token: Option<&str>, now: DateTime<Utc>) -> Authentication {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!(reason = %RejectionReason::MissingCredential, "authentication rejected");
            return Authentication::Rejected(Rejection {
                reason: RejectionReason::MissingCredential,
            });
        };

        match self.verifier.verify(token, now) {
            Ok(identity) => {
                tracing::debug!(user_id = %identity.user_id(), role = %identity.role(), "authenticated");
                Authentication::Authenticated(identity)
            }
            Err(err) => {
                tracing::debug!(reason = %err, "authentication rejected");
                Authentication::Rejected(Rejection { reason: err.into() })
            }
        }
    }
}
