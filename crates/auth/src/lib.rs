//! `cleanops-auth` — the request-trust boundary.
//!
//! Payload cipher, signed token codec, authentication guard and authorization
//! guard. This crate is intentionally decoupled from HTTP and storage.

pub mod authenticate;
pub mod authorize;
pub mod cipher;
pub mod claims;
pub mod directory;
pub mod issuer;
pub mod operation;
pub mod roles;
pub mod token;

pub use authenticate::{Authentication, AuthenticationGuard, Rejection, RejectionReason, AUTHENTICATION_REQUIRED};
pub use authorize::{
    authorize, explain_authorization, AuthorizationExplanation, AuthorizationPolicy, AuthzError, PolicyTable,
};
pub use cipher::{DecryptionFailure, EncryptionError, KeyLengthError, PayloadCipher};
pub use claims::{validate_expiry, ClaimsRecord, SignedClaims, TokenValidationError, VerifiedIdentity};
pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory, UserRecord};
pub use issuer::{IssuedToken, IssuerError, TokenIssuer};
pub use operation::OperationId;
pub use roles::Role;
pub use token::{
    IssueError, TokenCodec, TokenConfig, TokenConfigError, TokenError, TokenVerifier, DEFAULT_TTL_SECS,
    MAX_TTL_SECS,
};
