//! Token issuance from directory records.
//!
//! The directory is consulted here, at issue time, and never during
//! verification: a token stays valid until it expires even if the user record
//! changes afterwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use cleanops_core::UserId;

use crate::directory::{DirectoryError, UserDirectory, UserRecord};
use crate::token::{IssueError, TokenCodec};
use crate::ClaimsRecord;

#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("unknown user")]
    UnknownUser,

    #[error("user account is inactive")]
    InactiveUser,

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Issue(#[from] IssueError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    directory: Arc<dyn UserDirectory>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { codec, directory }
    }

    pub async fn issue_for_user(&self, id: &UserId, now: DateTime<Utc>) -> Result<IssuedToken, IssuerError> {
        let user = self.directory.find_by_id(id).await?;
        self.issue_for_record(user, now)
    }

    pub async fn issue_for_email(&self, email: &str, now: DateTime<Utc>) -> Result<IssuedToken, IssuerError> {
        let user = self.directory.find_by_email(email).await?;
        self.issue_for_record(user, now)
    }

    fn issue_for_record(&self, user: Option<UserRecord>, now: DateTime<Utc>) -> Result<IssuedToken, IssuerError> {
        let user = user.ok_or(IssuerError::UnknownUser)?;
        if !user.is_active {
            tracing::info!(user_id = %user.id, "refusing to issue token for inactive user");
            return Err(IssuerError::InactiveUser);
        }

        let claims = ClaimsRecord {
            user_id: user.id,
            email: user.email,
            role: user.role,
            username: user.username,
        };
        let expires_at = self.codec.expires_at(now)?;
        let token = self.codec.issue(&claims, now)?;

        tracing::debug!(user_id = %claims.user_id, role = %claims.role, "issued token");
        Ok(IssuedToken {
            token,
            expires_at,
        })
    }
}
