//! In-memory backend
//!
//! A process-local stand-in for the hosted service. Used by the `memory`
//! mode of the client and by tests: every call is recorded, and failures
//! can be injected per operation, table and filter.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    backend::{AuthBackend, Filter, TableBackend},
    error::{BackendError, BackendResult},
    identity::{AuthChange, AuthSubscription, AuthUser, Session, SignUpOutcome},
};

/// Operations of the service contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SignUp,
    SignIn,
    SignOut,
    GetCurrentUser,
    Select,
    Insert,
    Update,
    Delete,
}

/// A call received by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub table: Option<String>,
    pub filter: Option<Filter>,
}

/// Failure injected into matching calls
#[derive(Debug, Clone)]
pub struct Failure {
    operation: Operation,
    table: Option<String>,
    filter: Option<Filter>,
    message: String,
    status: Option<u16>,
    remaining: Option<usize>,
}

impl Failure {
    /// Fail every call of `operation`
    pub fn on(operation: Operation) -> Self {
        Self {
            operation,
            table: None,
            filter: None,
            message: "injected failure".to_string(),
            status: None,
            remaining: None,
        }
    }

    /// Only calls against `table`
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Only calls carrying `filter`
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Message reported by the failing call
    pub fn message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    /// HTTP status reported by the failing call.
    ///
    /// Defaults to 500 for table calls and 400 for auth calls.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Fail the next matching call only
    pub fn once(mut self) -> Self {
        self.remaining = Some(1);
        self
    }

    fn matches(&self, call: &RecordedCall) -> bool {
        self.operation == call.operation
            && self
                .table
                .as_ref()
                .is_none_or(|table| call.table.as_ref() == Some(table))
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| call.filter.as_ref() == Some(filter))
    }
}

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    tables: HashMap<String, Vec<Value>>,
    session: Option<Session>,
    calls: Vec<RecordedCall>,
    failures: Vec<Failure>,
}

impl MemoryState {
    /// Record a call and apply any injected failure
    fn enter(
        &mut self,
        operation: Operation,
        table: Option<&str>,
        filter: Option<&Filter>,
    ) -> BackendResult<()> {
        let call = RecordedCall {
            operation,
            table: table.map(str::to_string),
            filter: filter.cloned(),
        };

        let failure = self.failures.iter_mut().find(|failure| {
            failure.matches(&call) && failure.remaining.is_none_or(|remaining| remaining > 0)
        });

        let result = match failure {
            Some(failure) => {
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining -= 1;
                }
                let status = failure
                    .status
                    .unwrap_or(if table.is_some() { 500 } else { 400 });
                Err(BackendError::service(status, failure.message.clone()))
            }
            None => Ok(()),
        };

        self.calls.push(call);
        result
    }
}

/// In-memory implementation of the service contract
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<AuthChange>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
        }
    }

    /// Create a confirmed account directly, bypassing the call log
    pub async fn register_account(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };
        self.state.lock().await.accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Put rows into a table, bypassing the call log
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        self.state
            .lock()
            .await
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Current contents of a table
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Inject a failure
    pub async fn fail(&self, failure: Failure) {
        self.state.lock().await.failures.push(failure);
    }

    /// Remove every injected failure
    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Calls received so far, oldest first
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls of one operation received so far
    pub async fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Forget the recorded calls
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Drop the current session as if its token expired
    pub async fn expire_session(&self) {
        if self.state.lock().await.session.take().is_some() {
            info!("In-memory session expired");
            self.publish(AuthChange::TokenExpired);
        }
    }

    fn publish(&self, change: AuthChange) {
        // No subscriber is not an error
        let _ = self.events.send(change);
    }
}

fn project(row: &Value, columns: &str) -> Value {
    let columns = columns.trim();
    if columns.is_empty() || columns == "*" {
        return row.clone();
    }

    let projected: Map<String, Value> = columns
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(|column| {
            (
                column.to_string(),
                row.get(column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    Value::Object(projected)
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> BackendResult<SignUpOutcome> {
        let mut state = self.state.lock().await;
        state.enter(Operation::SignUp, None, None)?;

        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(BackendError::service(422, "User already registered"));
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };
        state.accounts.insert(
            key,
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        info!("In-memory account created: {}", user.id);

        // Accounts start unconfirmed: no session until the user signs in
        Ok(SignUpOutcome {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = {
            let mut state = self.state.lock().await;
            state.enter(Operation::SignIn, None, None)?;

            let account = state
                .accounts
                .get(&email.to_lowercase())
                .filter(|account| account.password == password)
                .ok_or_else(|| BackendError::service(400, "Invalid login credentials"))?;

            let session = Session::new(
                format!("memory-{}", Uuid::new_v4()),
                Some(Uuid::new_v4().to_string()),
                account.user.clone(),
            );
            state.session = Some(session.clone());
            session
        };

        self.publish(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        {
            let mut state = self.state.lock().await;
            state.enter(Operation::SignOut, None, None)?;
            state.session = None;
        }

        self.publish(AuthChange::SignedOut);
        Ok(())
    }

    async fn get_current_user(&self) -> BackendResult<Option<AuthUser>> {
        let mut state = self.state.lock().await;
        state.enter(Operation::GetCurrentUser, None, None)?;

        let expired = state
            .session
            .as_ref()
            .is_some_and(|session| session.is_expired(Utc::now()));
        if expired {
            state.session = None;
            drop(state);
            self.publish(AuthChange::TokenExpired);
            return Ok(None);
        }

        Ok(state.session.as_ref().map(|session| session.user.clone()))
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

#[async_trait]
impl TableBackend for InMemoryBackend {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filter: &Filter,
    ) -> BackendResult<Vec<Value>> {
        let mut state = self.state.lock().await;
        state.enter(Operation::Select, Some(table), Some(filter))?;

        let rows = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.matches(row))
                    .map(|row| project(row, columns))
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn insert(
        &self,
        table: &str,
        records: Vec<Value>,
        returning: &str,
    ) -> BackendResult<Vec<Value>> {
        let mut state = self.state.lock().await;
        state.enter(Operation::Insert, Some(table), None)?;

        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            let Value::Object(mut fields) = record else {
                return Err(BackendError::service(400, "Records must be JSON objects"));
            };
            fields
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            inserted.push(Value::Object(fields));
        }

        let returned = inserted.iter().map(|row| project(row, returning)).collect();
        debug!("Inserted {} rows into {}", inserted.len(), table);
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(inserted);
        Ok(returned)
    }

    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.enter(Operation::Update, Some(table), Some(filter))?;

        let Value::Object(fields) = fields else {
            return Err(BackendError::service(400, "Update fields must be a JSON object"));
        };

        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| filter.matches(row)) {
                if let Value::Object(row) = row {
                    for (key, value) in &fields {
                        row.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> BackendResult<()> {
        let mut state = self.state.lock().await;
        state.enter(Operation::Delete, Some(table), Some(filter))?;

        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }
        Ok(())
    }
}
