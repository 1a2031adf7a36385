//! Contract of the hosted auth/data service
//!
//! The client only ever talks to the service through these two traits:
//! password-based auth with a session, and table CRUD with equality filters.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::{
    error::BackendResult,
    identity::{AuthSubscription, AuthUser, Session, SignUpOutcome},
};

/// Equality filter on a single column (`field = value`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    /// Match rows whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Whether a JSON row satisfies the filter
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.field) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.field, self.value)
    }
}

/// Account and session operations
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create an account; `metadata` is stored alongside it
    async fn sign_up(&self, email: &str, password: &str, metadata: Value)
    -> BackendResult<SignUpOutcome>;

    /// Exchange an email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// Terminate the current session
    async fn sign_out(&self) -> BackendResult<()>;

    /// The user behind the current session, if any
    async fn get_current_user(&self) -> BackendResult<Option<AuthUser>>;

    /// Subscribe to auth-state changes
    fn on_auth_state_change(&self) -> AuthSubscription;
}

/// Tabular CRUD operations
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// `table.select(columns).eq(filter)`
    async fn select(&self, table: &str, columns: &str, filter: &Filter) -> BackendResult<Vec<Value>>;

    /// `table.insert(records).select(returning)`
    async fn insert(&self, table: &str, records: Vec<Value>, returning: &str)
    -> BackendResult<Vec<Value>>;

    /// `table.update(fields).eq(filter)`
    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> BackendResult<()>;

    /// `table.delete().eq(filter)`
    async fn delete(&self, table: &str, filter: &Filter) -> BackendResult<()>;
}
