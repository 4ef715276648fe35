//! User directory trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::UserId;
use thiserror::Error;

/// Errors returned by a user directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory answered and does not know the user.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The directory could not be reached or answered with an error.
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// Answers whether a user exists.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Succeeds if the user exists.
    async fn ensure_exists(&self, user_id: UserId) -> Result<(), DirectoryError>;
}

#[derive(Debug)]
enum Membership {
    AllowAll,
    Known(HashSet<UserId>),
}

#[derive(Debug)]
struct InMemoryDirectoryState {
    membership: Membership,
    unavailable: bool,
}

/// In-memory user directory.
///
/// Either accepts every user or only an explicit set.
#[derive(Debug, Clone)]
pub struct InMemoryUserDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl InMemoryUserDirectory {
    /// Creates a directory that knows every user.
    pub fn allow_all() -> Self {
        Self::with_membership(Membership::AllowAll)
    }

    /// Creates a directory that knows only `users`.
    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        Self::with_membership(Membership::Known(users.into_iter().collect()))
    }

    fn with_membership(membership: Membership) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryDirectoryState {
                membership,
                unavailable: false,
            })),
        }
    }

    /// Adds a user. Has no effect on an allow-all directory.
    pub fn register(&self, user_id: UserId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Membership::Known(users) = &mut state.membership {
            users.insert(user_id);
        }
    }

    /// Makes every lookup fail as if the directory were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unavailable = unavailable;
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn ensure_exists(&self, user_id: UserId) -> Result<(), DirectoryError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        if state.unavailable {
            return Err(DirectoryError::Unavailable(
                "directory is offline".to_string(),
            ));
        }

        match &state.membership {
            Membership::AllowAll => Ok(()),
            Membership::Known(users) if users.contains(&user_id) => Ok(()),
            Membership::Known(_) => Err(DirectoryError::UserNotFound(user_id)),
        }
    }
}
