//! Session state model

use common::identity::AuthUser;
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthStatus {
    /// Not started yet
    Uninitialized,
    /// Waiting for the first answer from the service
    Loading,
    /// A user is signed in
    Authenticated,
    /// Nobody is signed in
    Anonymous,
}

/// Signed-in identity as seen by views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<&AuthUser> for SessionUser {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.full_name().map(str::to_string),
        }
    }
}

/// Snapshot of the session published to views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub status: AuthStatus,
    pub user: Option<SessionUser>,
}

impl SessionState {
    /// State before initialization
    pub fn uninitialized() -> Self {
        Self {
            status: AuthStatus::Uninitialized,
            user: None,
        }
    }

    /// State while the current user is being resolved
    pub fn resolving() -> Self {
        Self {
            status: AuthStatus::Loading,
            user: None,
        }
    }

    /// State with a signed-in user
    pub fn authenticated(user: SessionUser) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            user: Some(user),
        }
    }

    /// State with nobody signed in
    pub fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            user: None,
        }
    }

    /// True until the first resolution
    pub fn loading(&self) -> bool {
        matches!(
            self.status,
            AuthStatus::Uninitialized | AuthStatus::Loading
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}
