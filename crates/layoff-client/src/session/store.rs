use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use super::types::{
    AuthResponse, Credentials, RefreshResponse, Registration, SessionSnapshot, SessionStatus,
    Token, User, UserUpdate,
};
use super::validation;
use crate::broadcast::{StoreEvent, StoreEventBroadcaster};
use crate::config::ClientConfig;
use crate::epoch::RequestEpoch;
use crate::error::{ClientError, Result, StorageError};
use crate::gateway::{
    decode, decode_unit, endpoints, failure_from_transport, ApiFailure, ApiRequest, Transport,
    SESSION_EXPIRED_MESSAGE,
};
use crate::lock;
use crate::storage::{
    KeyValueStore, ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, REFRESH_TOKEN_KEY, SESSION_EXPIRY_KEY,
    USER_KEY,
};
use crate::SharedClock;

#[derive(Default)]
struct SessionState {
    principal: Option<User>,
    access_token: Option<Token>,
    refresh_token: Option<Token>,
    expires_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    error: Option<String>,
}

impl SessionState {
    fn has_credentials(&self) -> bool {
        self.principal.is_some() || self.access_token.is_some()
    }

    fn clear_credentials(&mut self) {
        self.principal = None;
        self.access_token = None;
        self.refresh_token = None;
        self.expires_at = None;
    }

    /// The stored status, demoted to `Idle` once the clock has passed expiry.
    fn effective_status(&self, now: DateTime<Utc>) -> SessionStatus {
        match self.status {
            SessionStatus::Authenticated
                if self.principal.is_none()
                    || self.access_token.is_none()
                    || self.expires_at.map_or(true, |t| now >= t) =>
            {
                SessionStatus::Idle
            }
            status => status,
        }
    }
}

/// Owns the authenticated identity, its tokens and their expiry.
///
/// Credential exchanges (login, register, refresh, logout, profile) go
/// straight to the transport rather than through the gateway: a 401 on a
/// login attempt means bad credentials, not an expired session.
pub struct SessionStore {
    state: RwLock<SessionState>,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn KeyValueStore>,
    clock: SharedClock,
    events: StoreEventBroadcaster,
    epoch: RequestEpoch,
    default_lifetime: TimeDelta,
    refresh_threshold: TimeDelta,
}

impl SessionStore {
    /// Creates the store and restores any persisted session.
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        clock: SharedClock,
        config: &ClientConfig,
        events: StoreEventBroadcaster,
    ) -> Self {
        let store = Self {
            state: RwLock::new(SessionState::default()),
            transport,
            storage,
            clock,
            events,
            epoch: RequestEpoch::new(),
            default_lifetime: config.session_expiry(),
            refresh_threshold: config.refresh_threshold(),
        };
        store.restore();
        store
    }

    // ─── credential exchanges ───

    pub async fn login(&self, credentials: Credentials) -> Result<User> {
        validation::validate_login(&credentials.email, credentials.password.expose_secret())?;

        let body = serde_json::json!({
            "email": credentials.email.trim(),
            "password": credentials.password.expose_secret(),
        });
        self.authenticate(ApiRequest::post(endpoints::AUTH_LOGIN).with_body(body))
            .await
    }

    pub async fn register(&self, registration: Registration) -> Result<User> {
        validation::validate_registration(
            &registration.name,
            &registration.email,
            registration.password.expose_secret(),
        )?;

        let body = serde_json::json!({
            "name": registration.name.trim(),
            "email": registration.email.trim(),
            "password": registration.password.expose_secret(),
        });
        self.authenticate(ApiRequest::post(endpoints::AUTH_REGISTER).with_body(body))
            .await
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<User> {
        let epoch = self.epoch.begin();
        self.set_status(SessionStatus::Authenticating);

        let outcome = self.exchange::<AuthResponse>(request).await;
        if !self.epoch.is_current(epoch) {
            log::debug!("Discarding superseded authentication response");
            return Err(ClientError::Superseded);
        }

        match outcome {
            Ok(response) => {
                let expires_at = self.expiry_from(response.expires_in);
                let user = response.user;
                {
                    let mut state = self.write_state();
                    state.principal = Some(user.clone());
                    state.access_token = Some(Token::new(response.token));
                    state.refresh_token = response.refresh_token.map(Token::new);
                    state.expires_at = Some(expires_at);
                    state.status = SessionStatus::Authenticated;
                    state.error = None;
                    self.persist(&state);
                }
                log::info!("User {} authenticated until {}", user.id, expires_at);
                self.publish(SessionStatus::Authenticated);
                Ok(user)
            }
            Err(failure) => {
                log::warn!("Authentication failed: {}", failure.message);
                {
                    let mut state = self.write_state();
                    state.status = SessionStatus::Failed;
                    state.error = Some(failure.message.clone());
                }
                self.publish(SessionStatus::Failed);
                Err(failure.into())
            }
        }
    }

    /// Clears the local session, then tells the server on a best-effort basis.
    ///
    /// Never fails. Calling it with no session is a no-op.
    pub async fn logout(&self) {
        self.epoch.invalidate();

        let token = {
            let mut state = self.write_state();
            let token = state.access_token.clone();
            let had_session = state.has_credentials();
            state.clear_credentials();
            if state.status != SessionStatus::Failed {
                state.status = SessionStatus::Idle;
                state.error = None;
            }
            if had_session {
                log::info!("Logged out");
            }
            token
        };
        self.clear_persisted();
        self.publish(self.status());

        if let Some(token) = token {
            let request = ApiRequest::post(endpoints::AUTH_LOGOUT).with_bearer(Some(token));
            if let Err(failure) = self.exchange_unit(request).await {
                log::warn!(
                    "Server logout failed ({}); local session already cleared",
                    failure.message
                );
            }
        }
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Any failure ends the session in `Failed`; there is no retry.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = {
            let state = self.read_state();
            if state.status == SessionStatus::Failed {
                return Err(ClientError::NotAuthenticated(
                    "Session has failed; log in again".to_string(),
                ));
            }
            state.refresh_token.clone()
        };

        let Some(refresh_token) = refresh_token else {
            let message = "No refresh token available";
            self.fail_session(message);
            return Err(ClientError::NotAuthenticated(message.to_string()));
        };

        let epoch = self.epoch.begin();
        self.set_status(SessionStatus::Authenticating);

        let body = serde_json::json!({ "refreshToken": refresh_token.expose() });
        let outcome = self
            .exchange::<RefreshResponse>(ApiRequest::post(endpoints::AUTH_REFRESH).with_body(body))
            .await;
        if !self.epoch.is_current(epoch) {
            log::debug!("Discarding superseded refresh response");
            return Err(ClientError::Superseded);
        }

        match outcome {
            Ok(response) => {
                let expires_at = self.expiry_from(response.expires_in);
                {
                    let mut state = self.write_state();
                    state.access_token = Some(Token::new(response.token));
                    if let Some(rotated) = response.refresh_token {
                        state.refresh_token = Some(Token::new(rotated));
                    }
                    state.expires_at = Some(expires_at);
                    state.status = if state.principal.is_some() {
                        SessionStatus::Authenticated
                    } else {
                        SessionStatus::Idle
                    };
                    state.error = None;
                    self.persist(&state);
                }
                log::info!("Access token refreshed; valid until {}", expires_at);
                self.publish(self.status());
                Ok(())
            }
            Err(failure) => {
                log::warn!("Token refresh failed: {}", failure.message);
                self.fail_session(&failure.message);
                Err(failure.into())
            }
        }
    }

    /// `GET /auth/me`; replaces the principal with the server's copy.
    pub async fn fetch_profile(&self) -> Result<User> {
        let token = self
            .access_token()
            .ok_or_else(|| ClientError::NotAuthenticated("No active session".to_string()))?;

        let request = ApiRequest::get(endpoints::AUTH_ME).with_bearer(Some(token.clone()));
        match self.exchange::<User>(request).await {
            Ok(user) => {
                let mut state = self.write_state();
                if state.access_token.as_ref().map(Token::expose) == Some(token.expose()) {
                    state.principal = Some(user.clone());
                    self.persist(&state);
                } else {
                    log::debug!("Session changed while fetching profile; result not applied");
                }
                Ok(user)
            }
            Err(failure) if failure.is_unauthorized() => {
                self.expire_unauthorized(Some(&token));
                Err(ApiFailure::session_expired().into())
            }
            Err(failure) => {
                self.write_state().error = Some(failure.message.clone());
                Err(failure.into())
            }
        }
    }

    // ─── expiry ───

    /// `now >= expiresAt`. A session with no expiry counts as expired.
    pub fn is_expired(&self) -> bool {
        let now = self.clock.utc();
        self.read_state().expires_at.map_or(true, |t| now >= t)
    }

    /// True when an authenticated session is within the refresh threshold of
    /// its expiry and holds a refresh token.
    pub fn needs_refresh(&self) -> bool {
        let now = self.clock.utc();
        let state = self.read_state();
        state.status == SessionStatus::Authenticated
            && state.refresh_token.is_some()
            && state
                .expires_at
                .is_some_and(|t| now >= t - self.refresh_threshold)
    }

    /// Refreshes a session close to expiry, or ends one that has expired
    /// with nothing to refresh it with. No-op without an authenticated session.
    pub async fn ensure_fresh(&self) -> Result<()> {
        if self.read_state().status != SessionStatus::Authenticated {
            return Ok(());
        }
        if self.needs_refresh() {
            return self.refresh().await;
        }
        if self.expire_if_needed() {
            return Err(ClientError::NotAuthenticated(
                SESSION_EXPIRED_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }

    /// Ends an authenticated session whose clock has run out. Returns whether
    /// anything was cleared.
    pub fn expire_if_needed(&self) -> bool {
        let now = self.clock.utc();
        {
            let mut state = self.write_state();
            let expired = state.status == SessionStatus::Authenticated
                && state.expires_at.is_some_and(|t| now >= t);
            if !expired {
                return false;
            }
            state.clear_credentials();
            state.status = SessionStatus::Idle;
            state.error = Some(SESSION_EXPIRED_MESSAGE.to_string());
        }
        log::info!("Session expired");
        self.clear_persisted();
        self.publish(SessionStatus::Idle);
        true
    }

    /// Tears the session down after the server rejected `sent` with a 401.
    ///
    /// A 401 for a token that is no longer the current one is ignored, so a
    /// late rejection cannot end a session established after it was sent.
    pub fn expire_unauthorized(&self, sent: Option<&Token>) -> bool {
        let Some(sent) = sent else {
            log::debug!("401 on an unauthenticated request; no session to end");
            return false;
        };

        {
            let mut state = self.write_state();
            let current = state.access_token.as_ref().map(Token::expose);
            if current != Some(sent.expose()) {
                log::debug!("401 for a superseded token; current session kept");
                return false;
            }
            state.clear_credentials();
            state.status = SessionStatus::Failed;
            state.error = Some(SESSION_EXPIRED_MESSAGE.to_string());
        }
        log::warn!("Session rejected by server; credentials cleared");
        self.clear_persisted();
        self.publish(SessionStatus::Failed);
        true
    }

    // ─── local edits ───

    /// Merges display fields into the principal and persists it.
    pub fn update_user(&self, update: UserUpdate) -> Option<User> {
        let mut state = self.write_state();
        let user = state.principal.as_mut()?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = Some(avatar);
        }
        let updated = user.clone();
        self.persist(&state);
        Some(updated)
    }

    pub fn clear_error(&self) {
        self.write_state().error = None;
    }

    /// Drops the in-memory and persisted session without any network call.
    pub fn teardown(&self) {
        self.epoch.invalidate();
        {
            let mut state = self.write_state();
            *state = SessionState::default();
        }
        self.clear_persisted();
    }

    // ─── reads ───

    pub fn status(&self) -> SessionStatus {
        let now = self.clock.utc();
        self.read_state().effective_status(now)
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    pub fn principal(&self) -> Option<User> {
        self.read_state().principal.clone()
    }

    pub fn access_token(&self) -> Option<Token> {
        self.read_state().access_token.clone()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read_state().expires_at
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.utc();
        let state = self.read_state();
        SessionSnapshot {
            principal: state.principal.clone(),
            access_token: state.access_token.clone(),
            refresh_token: state.refresh_token.clone(),
            expires_at: state.expires_at,
            status: state.effective_status(now),
            error: state.error.clone(),
        }
    }

    // ─── internals ───

    async fn exchange<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<T, ApiFailure> {
        let span = tracing::info_span!("auth_request", path = %request.path);
        async {
            let raw = self
                .transport
                .execute(request)
                .await
                .map_err(|e| failure_from_transport(&e))?;
            decode(&raw)
        }
        .instrument(span)
        .await
    }

    async fn exchange_unit(&self, request: ApiRequest) -> std::result::Result<(), ApiFailure> {
        let span = tracing::info_span!("auth_request", path = %request.path);
        async {
            let raw = self
                .transport
                .execute(request)
                .await
                .map_err(|e| failure_from_transport(&e))?;
            decode_unit(&raw)
        }
        .instrument(span)
        .await
    }

    fn expiry_from(&self, expires_in: Option<i64>) -> DateTime<Utc> {
        let now = self.clock.utc();
        let lifetime = expires_in
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(self.default_lifetime);
        now.checked_add_signed(lifetime)
            .unwrap_or(now + self.default_lifetime)
    }

    fn fail_session(&self, message: &str) {
        {
            let mut state = self.write_state();
            state.clear_credentials();
            state.status = SessionStatus::Failed;
            state.error = Some(message.to_string());
        }
        self.clear_persisted();
        self.publish(SessionStatus::Failed);
    }

    fn set_status(&self, status: SessionStatus) {
        self.write_state().status = status;
        self.publish(status);
    }

    fn publish(&self, status: SessionStatus) {
        self.events.send(StoreEvent::SessionChanged { status });
    }

    /// Trust-on-read: a stored user and access token are enough to start
    /// authenticated, unless the stored expiry has already passed.
    fn restore(&self) {
        let (Some(token), Some(user_json)) =
            (self.read_key(ACCESS_TOKEN_KEY), self.read_key(USER_KEY))
        else {
            log::debug!("No persisted session");
            return;
        };

        let user: User = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                log::warn!("Persisted user is unreadable ({}); discarding session", e);
                self.clear_persisted();
                return;
            }
        };

        let now = self.clock.utc();
        let stored_expiry = self
            .read_key(SESSION_EXPIRY_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        if stored_expiry.is_some_and(|t| now >= t) {
            log::info!("Persisted session has expired; discarding it");
            self.clear_persisted();
            return;
        }

        let mut state = self.write_state();
        state.principal = Some(user);
        state.access_token = Some(Token::new(token));
        state.refresh_token = self.read_key(REFRESH_TOKEN_KEY).map(Token::new);
        state.expires_at = Some(stored_expiry.unwrap_or(now + self.default_lifetime));
        state.status = SessionStatus::Authenticated;
        if stored_expiry.is_none() {
            self.persist(&state);
        }
        log::info!(
            "Restored session for user {}",
            state.principal.as_ref().map(|u| u.id.as_str()).unwrap_or("?")
        );
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                log::warn!("Failed to read '{}' from storage: {}", key, e);
                None
            }
        }
    }

    fn persist(&self, state: &SessionState) {
        if let Err(e) = self.write_credentials(state) {
            log::error!("Failed to persist session: {}", e);
        }
    }

    fn write_credentials(&self, state: &SessionState) -> std::result::Result<(), StorageError> {
        match &state.access_token {
            Some(token) => self.storage.set(ACCESS_TOKEN_KEY, token.expose())?,
            None => self.storage.remove(ACCESS_TOKEN_KEY)?,
        }
        match &state.refresh_token {
            Some(token) => self.storage.set(REFRESH_TOKEN_KEY, token.expose())?,
            None => self.storage.remove(REFRESH_TOKEN_KEY)?,
        }
        match state.expires_at {
            Some(at) => self
                .storage
                .set(SESSION_EXPIRY_KEY, &at.timestamp_millis().to_string())?,
            None => self.storage.remove(SESSION_EXPIRY_KEY)?,
        }
        match &state.principal {
            Some(user) => self.storage.set(USER_KEY, &serde_json::to_string(user)?)?,
            None => self.storage.remove(USER_KEY)?,
        }
        Ok(())
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.storage.remove_all(&CREDENTIAL_KEYS) {
            log::error!("Failed to clear persisted credentials: {}", e);
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        lock::read(&self.state, "Session")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        lock::write(&self.state, "Session")
    }
}
