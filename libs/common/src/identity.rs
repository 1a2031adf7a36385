//! Identity types issued by the hosted auth service
//!
//! Users, sessions and the auth-state change notifications the service
//! pushes to its clients.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;
use uuid::Uuid;

/// Account record returned by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Full name stored in the account metadata at sign-up
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(|value| value.as_str())
            .filter(|name| !name.trim().is_empty())
    }
}

/// A signed-in session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    /// Create a session, reading the expiry from the access token when it is a JWT
    pub fn new(access_token: String, refresh_token: Option<String>, user: AuthUser) -> Self {
        let expires_at = token_expiry(&access_token);
        Self {
            access_token,
            refresh_token,
            expires_at,
            user,
        }
    }

    /// Whether the access token is past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Read the `exp` claim of a JWT without verifying its signature.
///
/// The client never holds the signing secret; the service is the one
/// verifying tokens, the client only needs to know when to stop using one.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Utc.timestamp_opt(data.claims.exp, 0).single()
}

/// Result of an account creation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignUpOutcome {
    /// The created account, absent when the service withholds it
    pub user: Option<AuthUser>,
    /// Present when the service signs the user in right away
    pub session: Option<Session>,
}

/// Auth-state change notification
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
    TokenExpired,
}

impl AuthChange {
    /// Session carried by the notification, if any
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => Some(session),
            AuthChange::SignedOut | AuthChange::TokenExpired => None,
        }
    }
}

/// Live subscription to auth-state changes
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Wrap a broadcast receiver
    pub fn new(receiver: broadcast::Receiver<AuthChange>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change; `None` once the publisher is gone
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Auth subscription lagged, skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Discard the notifications already queued, returning how many were dropped
    pub fn drain(&mut self) -> u64 {
        let mut dropped = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(_) => dropped += 1,
                Err(TryRecvError::Lagged(skipped)) => dropped += skipped,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return dropped,
            }
        }
    }

    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        drop(self.receiver);
    }
}
