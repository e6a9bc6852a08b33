//! User-directory capability consumed at token-issue time.
//!
//! The directory is owned by another subsystem (persistence, user management).
//! This crate only needs "look a user up, without password material".

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use cleanops_core::UserId;

use crate::Role;

/// Directory view of a user. Never carries password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,

    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// All users, optionally restricted to one role, ordered by id.
    async fn list(&self, role: Option<Role>) -> Result<Vec<UserRecord>, DirectoryError>;

    async fn remove(&self, id: &UserId) -> Result<(), DirectoryError>;
}

/// In-memory directory.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }

    pub fn insert(&self, user: UserRecord) -> Result<(), DirectoryError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        users.insert(user.id.clone(), user);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, role: Option<Role>) -> Result<Vec<UserRecord>, DirectoryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect())
    }

    async fn remove(&self, id: &UserId) -> Result<(), DirectoryError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        users.remove(id).map(|_| ()).ok_or(DirectoryError::NotFound)
    }
}
