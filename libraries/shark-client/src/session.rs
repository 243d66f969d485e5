//! Mutable session facts owned by the engine.

use crate::store::{persist, SettingsStore, SESSION_ID_KEY, USER_ID_KEY};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Session id, communication token, device identity and login facts.
///
/// The communication token is only usable while its freshness deadline
/// lies in the future. Session id and user id are mirrored to the
/// settings store on every change.
pub struct SessionState {
    session_id: String,
    token: String,
    token_deadline: Option<Instant>,
    country: Option<Value>,
    device_uuid: String,
    user_id: String,
    logged_in: bool,
    store: Arc<dyn SettingsStore>,
}

impl SessionState {
    /// Load persisted state and generate a fresh device identifier.
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let session_id = store.get(SESSION_ID_KEY).unwrap_or_default();
        let user_id = store.get(USER_ID_KEY).unwrap_or_default();
        let device_uuid = uuid::Uuid::new_v4().to_string().to_uppercase();

        debug!(
            has_session = !session_id.is_empty(),
            has_user = !user_id.is_empty(),
            uuid = %device_uuid,
            "Loaded session state"
        );

        Self {
            logged_in: !user_id.is_empty(),
            session_id,
            token: String::new(),
            token_deadline: None,
            country: None,
            device_uuid,
            user_id,
            store,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }

    pub fn set_session_id(&mut self, session_id: String) {
        persist(self.store.as_ref(), SESSION_ID_KEY, &session_id);
        self.session_id = session_id;
    }

    /// Current token, empty once the freshness timer has fired.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Store a new token and (re)start its freshness timer.
    pub fn set_token(&mut self, token: String, lifetime: Duration) {
        self.token = token;
        self.token_deadline = Some(Instant::now() + lifetime);
    }

    pub fn token_deadline(&self) -> Option<Instant> {
        self.token_deadline
    }

    pub fn has_fresh_token(&self) -> bool {
        !self.token.is_empty()
            && self
                .token_deadline
                .is_some_and(|deadline| deadline > Instant::now())
    }

    /// Stop the freshness timer and discard the token.
    pub fn expire_token(&mut self) {
        self.token.clear();
        self.token_deadline = None;
    }

    pub fn country(&self) -> Option<&Value> {
        self.country.as_ref()
    }

    pub fn set_country(&mut self, country: Value) {
        self.country = Some(country);
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn set_user_id(&mut self, user_id: String) {
        persist(self.store.as_ref(), USER_ID_KEY, &user_id);
        self.user_id = user_id;
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
    }

    /// Forget the session, its token and the country it was issued for.
    pub fn clear(&mut self) {
        self.set_session_id(String::new());
        self.expire_token();
        self.country = None;
    }
}
