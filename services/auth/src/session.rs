//! Session manager
//!
//! Owns the signed-in identity of the client. Sign-up, sign-in and sign-out
//! go through here; views read snapshots of the state or subscribe to it,
//! they never change it themselves.

use chrono::NaiveDate;
use common::{
    backend::{AuthBackend, TableBackend},
    identity::AuthSubscription,
    routes::Route,
};
use serde_json::json;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    models::{NewProfile, SessionState, SessionUser, SignUpRequest},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::ProfileRepository,
    validation::{validate_credentials, validate_email, validate_full_name, validate_password},
};

/// Name shown when a user has none on record
pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// Requests from the manager to its listener task
enum Control {
    /// Drop queued notifications, then publish a locally decided state
    Settle {
        state: SessionState,
        done: oneshot::Sender<()>,
    },
    Stop,
}

/// Background task applying auth-state notifications
struct Listener {
    control: mpsc::UnboundedSender<Control>,
    handle: JoinHandle<()>,
}

/// Session manager for the signed-in user
pub struct SessionManager {
    auth: Arc<dyn AuthBackend>,
    profiles: ProfileRepository,
    rate_limiter: RateLimiter,
    state: Arc<watch::Sender<SessionState>>,
    listener: Option<Listener>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(auth: Arc<dyn AuthBackend>, tables: Arc<dyn TableBackend>) -> Self {
        Self::with_rate_limiter(auth, tables, RateLimiterConfig::default())
    }

    /// Create a session manager with a custom sign-in limit
    pub fn with_rate_limiter(
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableBackend>,
        config: RateLimiterConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::uninitialized());
        Self {
            auth,
            profiles: ProfileRepository::new(tables),
            rate_limiter: RateLimiter::new(config),
            state: Arc::new(state),
            listener: None,
        }
    }

    /// Resolve the current user and start following auth-state changes.
    ///
    /// Calling it again while already initialized only returns the state.
    pub async fn initialize(&mut self) -> SessionState {
        if self.listener.is_some() {
            return self.state();
        }

        info!("Initializing session");
        self.state.send_replace(SessionState::resolving());

        // Subscribe before asking, so a change racing the answer is not lost
        let subscription = self.auth.on_auth_state_change();

        let resolved = match self.auth.get_current_user().await {
            Ok(Some(user)) => {
                info!("Session restored for user: {}", user.id);
                SessionState::authenticated(SessionUser::from(&user))
            }
            Ok(None) => SessionState::anonymous(),
            Err(e) => {
                warn!("Failed to get current user: {}", e);
                SessionState::anonymous()
            }
        };
        self.state.send_replace(resolved.clone());

        let (control, controls) = mpsc::unbounded_channel();
        let handle = tokio::spawn(follow_changes(
            subscription,
            Arc::clone(&self.state),
            controls,
        ));
        self.listener = Some(Listener { control, handle });

        resolved
    }

    /// Stop following auth-state changes
    pub async fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            let _ = listener.control.send(Control::Stop);
            if let Err(e) = listener.handle.await {
                warn!("Auth listener ended abnormally: {}", e);
            }
            info!("Session manager shut down");
        }
    }

    /// Create an account and its profile.
    ///
    /// Returns the page to go to next.
    pub async fn sign_up(&self, request: &SignUpRequest) -> AuthResult<Route> {
        self.sign_up_with(
            &request.full_name,
            request.birth_date,
            &request.email,
            &request.password,
        )
        .await
    }

    /// Create an account and its profile from individual fields
    pub async fn sign_up_with(
        &self,
        full_name: &str,
        birth_date: NaiveDate,
        email: &str,
        password: &str,
    ) -> AuthResult<Route> {
        let email = email.trim();
        validate_full_name(full_name).map_err(AuthError::Validation)?;
        validate_email(email).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        info!("Signing up: {}", email);
        let metadata = json!({ "full_name": full_name.trim() });
        let outcome = self
            .auth
            .sign_up(email, password, metadata)
            .await
            .map_err(|e| {
                error!("Failed to create account: {}", e);
                AuthError::from(e)
            })?;

        let user = outcome.user.ok_or_else(|| {
            error!("Account creation returned no user");
            AuthError::Remote("account creation returned no user".to_string())
        })?;

        let profile = NewProfile::new(
            user.id,
            user.email.as_deref().unwrap_or(email),
            full_name,
            birth_date,
        );
        self.profiles.create(&profile).await.map_err(|e| {
            error!("Failed to save profile for {}: {}", user.id, e);
            AuthError::from(e)
        })?;

        if let Some(session) = outcome.session {
            self.settle(SessionState::authenticated(SessionUser::from(&session.user)))
                .await;
        }

        info!("Account created for user: {}", user.id);
        Ok(Route::SignIn)
    }

    /// Sign in with email and password.
    ///
    /// Returns the page to go to next.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Route> {
        if !self.rate_limiter.is_allowed().await {
            warn!("Sign-in rejected locally: too many failed attempts");
            return Err(AuthError::RateLimited);
        }

        validate_credentials(email, password).map_err(AuthError::Validation)?;

        match self
            .auth
            .sign_in_with_password(email.trim(), password)
            .await
        {
            Ok(session) => {
                self.rate_limiter.reset().await;
                info!("User signed in: {}", session.user.id);
                self.settle(SessionState::authenticated(SessionUser::from(&session.user)))
                    .await;
                Ok(Route::Dashboard)
            }
            Err(e) if e.is_rejection() => {
                let failures = self.rate_limiter.record_failure().await;
                warn!("Sign-in failed ({} consecutive): {}", failures, e);
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!("Sign-in could not reach the service: {}", e);
                Err(AuthError::from(e))
            }
        }
    }

    /// Sign out. The local session is cleared even when the service call fails.
    pub async fn sign_out(&self) -> Route {
        if let Err(e) = self.auth.sign_out().await {
            warn!("Remote sign-out failed, clearing local session anyway: {}", e);
        }

        self.settle(SessionState::anonymous()).await;
        info!("User signed out");
        Route::SignIn
    }

    /// Publish a state decided locally.
    ///
    /// Notifications queued before this point describe an older session and
    /// are dropped, so they cannot override it.
    async fn settle(&self, next: SessionState) {
        if let Some(listener) = &self.listener {
            let (done, settled) = oneshot::channel();
            let request = Control::Settle {
                state: next.clone(),
                done,
            };
            if listener.control.send(request).is_ok() && settled.await.is_ok() {
                return;
            }
            warn!("Auth listener is gone, publishing state directly");
        }
        self.state.send_replace(next);
    }

    /// Name to greet the signed-in user with
    pub async fn display_name(&self) -> Option<String> {
        let user = self.current_user()?;

        match self.profiles.find_full_name(user.id).await {
            Ok(Some(full_name)) => return Some(full_name),
            Ok(None) => {}
            Err(e) => error!("Failed to fetch profile name for {}: {}", user.id, e),
        }

        Some(
            user.display_name
                .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string()),
        )
    }

    /// Allow sign-in attempts again
    pub async fn reset_attempts(&self) {
        self.rate_limiter.reset().await;
    }

    /// Sign-in attempts left before the local lock
    pub async fn remaining_attempts(&self) -> u32 {
        self.rate_limiter.remaining().await
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<SessionUser> {
        self.state.borrow().user.clone()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.handle.abort();
        }
    }
}

async fn follow_changes(
    mut subscription: AuthSubscription,
    state: Arc<watch::Sender<SessionState>>,
    mut controls: mpsc::UnboundedReceiver<Control>,
) {
    loop {
        tokio::select! {
            control = controls.recv() => match control {
                Some(Control::Settle { state: next, done }) => {
                    let dropped = subscription.drain();
                    if dropped > 0 {
                        debug!("Dropped {} auth changes superseded locally", dropped);
                    }
                    state.send_replace(next);
                    let _ = done.send(());
                }
                Some(Control::Stop) | None => break,
            },
            change = subscription.recv() => {
                let Some(change) = change else { break };
                let next = match change.session() {
                    Some(session) => SessionState::authenticated(SessionUser::from(&session.user)),
                    None => SessionState::anonymous(),
                };
                debug!("Auth state change: {:?}", next.status);
                state.send_replace(next);
            }
        }
    }

    subscription.unsubscribe();
    debug!("Auth listener unsubscribed");
}
