//! HTTP backend for the hosted service
//!
//! Speaks the GoTrue-style auth API under `/auth/v1` and the PostgREST-style
//! table API under `/rest/v1`. The current session is kept in memory and its
//! access token is sent as the bearer for every table call.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use crate::{
    backend::{AuthBackend, Filter, TableBackend},
    config::BackendConfig,
    error::{BackendError, BackendResult},
    identity::{AuthChange, AuthSubscription, AuthUser, Session, SignUpOutcome},
};

/// Keys the service uses for error messages, most specific first
const ERROR_MESSAGE_KEYS: [&str; 4] = ["msg", "message", "error_description", "error"];

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(response: TokenResponse) -> Self {
        Session::new(response.access_token, response.refresh_token, response.user)
    }
}

/// Client for the hosted auth/data service
pub struct RestBackend {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl RestBackend {
    /// Build a client from validated configuration
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(BackendError::Transport)?;
        let (events, _) = broadcast::channel(16);

        info!("REST backend initialized with URL: {}", config.url);
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            session: Mutex::new(None),
            events,
        })
    }

    /// Session currently held by the client
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn bearer(&self) -> String {
        match self.session.lock().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        }
    }

    fn request(&self, method: Method, url: String, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(|e| {
            error!("Backend request failed: {}", e);
            BackendError::Transport(e)
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn store_session(&self, session: Option<Session>) {
        *self.session.lock().await = session;
    }

    fn publish(&self, change: AuthChange) {
        // No subscriber is not an error
        let _ = self.events.send(change);
    }

    async fn expire_session(&self) {
        self.store_session(None).await;
        info!("Session expired");
        self.publish(AuthChange::TokenExpired);
    }
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            ERROR_MESSAGE_KEYS.iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            }
        });

    warn!("Backend returned {}: {}", status, message);
    BackendError::Service { status, message }
}

/// Split a sign-up response into its user and optional session
fn parse_sign_up(body: Value) -> BackendResult<SignUpOutcome> {
    if body.get("access_token").is_some() {
        let response: TokenResponse = serde_json::from_value(body)?;
        let session = Session::from(response);
        return Ok(SignUpOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let user = if let Some(user) = body.get("user").filter(|user| !user.is_null()) {
        Some(serde_json::from_value(user.clone())?)
    } else if body.get("id").is_some() {
        Some(serde_json::from_value(body)?)
    } else {
        None
    };
    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> BackendResult<SignUpOutcome> {
        info!("Requesting account creation for: {}", email);

        let request = self
            .request(Method::POST, self.auth_url("signup"), &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }));
        let body: Value = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(BackendError::from)?;

        let outcome = parse_sign_up(body)?;
        if let Some(session) = outcome.session.clone() {
            self.store_session(Some(session.clone())).await;
            self.publish(AuthChange::SignedIn(session));
        }
        Ok(outcome)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        info!("Password sign-in for: {}", email);

        let request = self
            .request(Method::POST, self.auth_url("token"), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": email,
                "password": password,
            }));
        let response: TokenResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(BackendError::from)?;

        let session = Session::from(response);
        self.store_session(Some(session.clone())).await;
        self.publish(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let session = self.session.lock().await.take();

        let result = match session {
            Some(session) => {
                let request = self.request(
                    Method::POST,
                    self.auth_url("logout"),
                    &session.access_token,
                );
                self.send(request).await.map(|_| ())
            }
            None => Ok(()),
        };

        // The local session is gone whatever the service answered
        self.publish(AuthChange::SignedOut);
        result
    }

    async fn get_current_user(&self) -> BackendResult<Option<AuthUser>> {
        let Some(session) = self.session().await else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.expire_session().await;
            return Ok(None);
        }

        let request = self.request(Method::GET, self.auth_url("user"), &session.access_token);
        match self.send(request).await {
            Ok(response) => {
                let user: AuthUser = response.json().await.map_err(BackendError::from)?;
                Ok(Some(user))
            }
            Err(BackendError::Service { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                self.expire_session().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filter: &Filter,
    ) -> BackendResult<Vec<Value>> {
        debug!("select {} from {} where {}", columns, table, filter);

        let bearer = self.bearer().await;
        let condition = format!("eq.{}", filter.value);
        let request = self
            .request(Method::GET, self.table_url(table), &bearer)
            .query(&[("select", columns), (filter.field.as_str(), condition.as_str())]);
        self.send(request)
            .await?
            .json()
            .await
            .map_err(BackendError::from)
    }

    async fn insert(
        &self,
        table: &str,
        records: Vec<Value>,
        returning: &str,
    ) -> BackendResult<Vec<Value>> {
        debug!("insert {} rows into {}", records.len(), table);

        let bearer = self.bearer().await;
        let request = self
            .request(Method::POST, self.table_url(table), &bearer)
            .header("Prefer", "return=representation")
            .query(&[("select", returning)])
            .json(&records);
        self.send(request)
            .await?
            .json()
            .await
            .map_err(BackendError::from)
    }

    async fn update(&self, table: &str, fields: Value, filter: &Filter) -> BackendResult<()> {
        debug!("update {} where {}", table, filter);

        let bearer = self.bearer().await;
        let request = self
            .request(Method::PATCH, self.table_url(table), &bearer)
            .header("Prefer", "return=minimal")
            .query(&[(filter.field.clone(), format!("eq.{}", filter.value))])
            .json(&fields);
        self.send(request).await.map(|_| ())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> BackendResult<()> {
        debug!("delete from {} where {}", table, filter);

        let bearer = self.bearer().await;
        let request = self
            .request(Method::DELETE, self.table_url(table), &bearer)
            .query(&[(filter.field.clone(), format!("eq.{}", filter.value))]);
        self.send(request).await.map(|_| ())
    }
}
