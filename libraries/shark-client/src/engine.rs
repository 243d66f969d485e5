//! The connection state machine.
//!
//! A single task owns the session, the deferral queue and the token minter.
//! Submissions from [`SharkClient`](crate::SharkClient) handles, finished
//! exchanges and the token freshness deadline are all observed in one
//! `select!` loop, so transitions never interleave.
//!
//! ```text
//! Idle ──call──▶ Connecting ─────────────────────────────────▶ Connected
//!                 CreatingSession ─▶ RetrievingConfig ─▶ UpdatingToken   Authenticating
//!                 (skipped when a session is held)                       ├─▶ NotLoggedIn
//!   ▲                                                                    └─▶ LoggedIn
//!   └──── fault (from Connecting) / token expiry / invalid token or session ◀──┘
//! ```
//!
//! Connected is re-entered through deep history: the sub-state last
//! occupied is resumed instead of authenticating again.

use crate::auth::{authenticate_call, login_call, login_outcome, logout_call};
use crate::call::{Completion, PendingCall};
use crate::classify::{classify, Exchange, Outcome, Signal};
use crate::error::{ClientError, Result};
use crate::session::SessionState;
use crate::store::SettingsStore;
use crate::token::{secret_key, TokenMinter};
use crate::transport::Transport;
use crate::types::{
    AuthState, CallKind, ClientConfig, ConnectingStep, Params, Phase, RequestEnvelope,
    RequestHeader, Status, GET_COMMUNICATION_TOKEN, GET_CONFIG, INITIATE_SESSION,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Requests from client handles.
pub(crate) enum Command {
    Submit(PendingCall),
    Login {
        username: String,
        password: String,
        reply: oneshot::Sender<Result<String>>,
    },
    Logout(oneshot::Sender<Result<()>>),
}

/// Events produced inside the engine's own tasks.
enum Event {
    Exchanged { call: PendingCall, exchange: Exchange },
}

/// How a call is treated in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Dispatch,
    Defer,
    Reject,
}

/// Admission rule for a call in `phase`.
pub(crate) fn admit(phase: Phase, kind: CallKind, auth_required: bool) -> Admission {
    if kind == CallKind::System {
        return Admission::Dispatch;
    }
    match phase {
        Phase::Idle | Phase::Connecting(_) => Admission::Defer,
        Phase::Connected(AuthState::Authenticating) if auth_required => Admission::Defer,
        Phase::Connected(AuthState::NotLoggedIn) if auth_required => Admission::Reject,
        Phase::Connected(_) => Admission::Dispatch,
    }
}

pub(crate) struct Engine {
    config: ClientConfig,
    transport: Transport,
    minter: TokenMinter,
    session: SessionState,
    phase: Phase,
    /// Last Connected sub-state, resumed on re-entry
    history: AuthState,
    /// Bumped on every entry into Connected
    generation: u64,
    deferred: VecDeque<PendingCall>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    status: watch::Sender<Status>,
    /// Methods in dispatch order
    #[cfg(test)]
    dispatched: Vec<String>,
}

impl Engine {
    pub fn new(
        config: ClientConfig,
        transport: Transport,
        store: Arc<dyn SettingsStore>,
    ) -> (
        Self,
        mpsc::UnboundedSender<Command>,
        watch::Receiver<Status>,
    ) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = SessionState::load(store);

        let mut engine = Self {
            config,
            transport,
            minter: TokenMinter::new(),
            session,
            phase: Phase::Idle,
            history: AuthState::Authenticating,
            generation: 0,
            deferred: VecDeque::new(),
            commands,
            events_tx,
            events_rx,
            status: watch::channel(Status {
                phase: Phase::Idle,
                session_id: String::new(),
                user_id: String::new(),
                logged_in: false,
                has_token: false,
            })
            .0,
            #[cfg(test)]
            dispatched: Vec::new(),
        };
        let status = engine.status.subscribe();
        engine.publish();

        (engine, commands_tx, status)
    }

    /// Process events until every client handle is dropped.
    pub async fn run(mut self) {
        debug!(api_url = %self.config.api_url, "Engine started");

        loop {
            let deadline = self.session.token_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.on_event(event),
                () = token_expiry(deadline) => self.on_token_expired(),
            }
            self.publish();
        }

        self.shutdown();
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Submit(call) => self.submit(call),
            Command::Login {
                username,
                password,
                reply,
            } => {
                debug!(username = %username, "Logging in");
                self.submit(login_call(username, password, reply));
            }
            Command::Logout(reply) => {
                self.session.set_user_id(String::new());
                self.submit(logout_call(reply));
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Exchanged { call, exchange } => self.on_exchanged(call, exchange),
        }
    }

    // =========================================================================
    // Admission and dispatch
    // =========================================================================

    fn submit(&mut self, call: PendingCall) {
        match admit(self.phase, call.kind, call.auth_required) {
            Admission::Dispatch => self.dispatch(call),
            Admission::Defer => {
                debug!(id = call.id, method = %call.method, phase = %self.phase, "Deferring call");
                self.deferred.push_back(call);
                if self.phase == Phase::Idle {
                    self.begin_connecting();
                }
            }
            Admission::Reject => {
                debug!(id = call.id, method = %call.method, "Rejecting call, not logged in");
                self.finish(call, Err(ClientError::Cancelled));
            }
        }
    }

    fn dispatch(&mut self, mut call: PendingCall) {
        let token = self.minter.mint(
            &call.method,
            self.session.token(),
            &self.config.preset.salt,
        );
        let empty_country = Value::Object(serde_json::Map::new());
        let body = {
            let envelope = RequestEnvelope {
                method: &call.method,
                parameters: &call.params,
                header: RequestHeader {
                    client: &self.config.preset.client,
                    client_revision: self.config.preset.client_revision,
                    token,
                    country: self.session.country().unwrap_or(&empty_country),
                    session: self.session.session_id(),
                    privacy: 0,
                    uuid: self.session.device_uuid(),
                },
            };
            serde_json::to_vec(&envelope)
        };

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                error!(method = %call.method, error = %e, "Failed to serialize call");
                self.finish(call, Err(ClientError::Parse(e.to_string())));
                return;
            }
        };

        debug!(
            id = call.id,
            method = %call.method,
            kind = ?call.kind,
            resends = call.resends(),
            "Dispatching call"
        );

        #[cfg(test)]
        self.dispatched.push(call.method.clone());

        call.generation = self.generation;
        let transport = self.transport.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let exchange = transport.post(&call.method, body).await;
            // The engine is gone if this fails; the call's completion drops with it.
            let _ = events.send(Event::Exchanged { call, exchange });
        });
    }

    fn drain_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let queued = std::mem::take(&mut self.deferred);
        debug!(count = queued.len(), phase = %self.phase, "Releasing deferred calls");
        for call in queued {
            self.submit(call);
        }
    }

    fn on_exchanged(&mut self, mut call: PendingCall, exchange: Exchange) {
        let verdict = classify(call.kind, &call.method, exchange);

        if let Some(signal) = verdict.signal {
            self.raise(signal, call.generation);
        }

        match verdict.outcome {
            Outcome::Success(value) => self.finish(call, Ok(value)),
            Outcome::Fail(error) => self.finish(call, Err(error)),
            Outcome::Resend { code, message } => {
                if call.try_resend(code) {
                    info!(id = call.id, method = %call.method, code = %code, "Resending call after recovery");
                    self.submit(call);
                } else {
                    warn!(id = call.id, method = %call.method, code = %code, "Call failed again after recovery");
                    self.finish(call, Err(ClientError::from_fault(code, message)));
                }
            }
        }
    }

    /// Apply a recovery signal from a call dispatched under `generation`.
    ///
    /// Token and session faults from calls dispatched before the latest
    /// reconnection are stale: that reconnection already recovered.
    fn raise(&mut self, signal: Signal, generation: u64) {
        let stale = generation != self.generation;
        match signal {
            Signal::TokenInvalid if stale => {
                debug!("Ignoring invalid token from an earlier connection");
            }
            Signal::TokenInvalid => {
                warn!(phase = %self.phase, "Communication token rejected");
                self.session.expire_token();
                if self.phase.is_connected() {
                    self.enter_idle();
                }
            }
            Signal::SessionInvalid if stale => {
                debug!("Ignoring invalid session from an earlier connection");
            }
            Signal::SessionInvalid => {
                warn!(session = %self.session.session_id(), "Session rejected, clearing");
                self.session.clear();
                self.history = AuthState::Authenticating;
                if self.phase.is_connected() {
                    self.enter_idle();
                }
            }
            Signal::LoggedOut => {
                warn!("Server reports user is not logged in");
                self.login_finished(false);
            }
        }
    }

    /// Deliver a call's single completion.
    fn finish(&mut self, call: PendingCall, result: Result<Value>) {
        match call.completion {
            Completion::Caller(tx) => {
                if tx.send(result).is_err() {
                    debug!(id = call.id, method = %call.method, "Caller dropped before completion");
                }
            }
            Completion::SessionCreated => self.on_session_created(result),
            Completion::ConfigRetrieved => self.on_config_retrieved(result),
            Completion::TokenUpdated => self.on_token_updated(result),
            Completion::LoggedIn(reply) => self.on_logged_in(result, reply),
            Completion::LoggedOut(reply) => self.on_logged_out(result, reply),
        }
    }

    // =========================================================================
    // Phase transitions
    // =========================================================================

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Phase transition");
        }
        self.phase = phase;
        if let Phase::Connected(state) = phase {
            self.history = state;
        }
    }

    fn enter_idle(&mut self) {
        self.set_phase(Phase::Idle);
        if !self.deferred.is_empty() {
            debug!(count = self.deferred.len(), "Reconnecting for deferred calls");
            self.begin_connecting();
        }
    }

    fn fault(&mut self, reason: &str) {
        error!(phase = %self.phase, reason = %reason, "Connection fault");
        self.set_phase(Phase::Idle);
        let cancelled = std::mem::take(&mut self.deferred);
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "Cancelling deferred calls");
        }
        for call in cancelled {
            self.finish(call, Err(ClientError::Cancelled));
        }
    }

    fn begin_connecting(&mut self) {
        if self.session.has_session() {
            debug!("Reusing existing session");
            self.after_session();
        } else {
            self.set_phase(Phase::Connecting(ConnectingStep::CreatingSession));
            self.dispatch_system(INITIATE_SESSION, Params::new(), Completion::SessionCreated);
        }
    }

    fn after_session(&mut self) {
        if self.session.country().is_none() {
            self.set_phase(Phase::Connecting(ConnectingStep::RetrievingConfig));
            self.dispatch_system(GET_CONFIG, Params::new(), Completion::ConfigRetrieved);
        } else {
            self.update_token();
        }
    }

    fn update_token(&mut self) {
        self.set_phase(Phase::Connecting(ConnectingStep::UpdatingToken));
        let mut params = Params::new();
        params.insert(
            "secretKey".into(),
            Value::String(secret_key(self.session.session_id())),
        );
        self.dispatch_system(GET_COMMUNICATION_TOKEN, params, Completion::TokenUpdated);
    }

    fn dispatch_system(&mut self, method: &str, params: Params, completion: Completion) {
        self.submit(PendingCall::new(
            method,
            params,
            false,
            CallKind::System,
            completion,
        ));
    }

    /// A session fault cleared the session while a bootstrap step was in
    /// flight; its result belongs to the old session.
    fn restart_bootstrap(&mut self) {
        info!(phase = %self.phase, "Session cleared during bootstrap, starting over");
        self.begin_connecting();
    }

    fn enter_connected(&mut self) {
        self.generation += 1;
        let target = if self.session.user_id().is_empty() {
            AuthState::Authenticating
        } else {
            self.history
        };

        info!(state = ?target, generation = self.generation, "Connected");
        self.set_phase(Phase::Connected(target));
        if target == AuthState::Authenticating {
            self.authenticate();
        }
        self.drain_deferred();
    }

    fn authenticate(&mut self) {
        if self.session.user_id().is_empty() {
            debug!("No cached user, skipping authentication");
            self.login_finished(false);
            return;
        }

        let call = authenticate_call(self.session.user_id());
        self.submit(call);
    }

    fn login_finished(&mut self, ok: bool) {
        self.session.set_logged_in(ok);
        let target = if ok {
            AuthState::LoggedIn
        } else {
            AuthState::NotLoggedIn
        };

        match self.phase {
            Phase::Connected(current) if current != target => {
                self.set_phase(Phase::Connected(target));
                self.drain_deferred();
            }
            Phase::Connected(_) => {}
            _ => self.history = target,
        }
    }

    fn on_token_expired(&mut self) {
        info!("Communication token expired");
        self.session.expire_token();
        if self.phase.is_connected() {
            self.enter_idle();
        }
    }

    // =========================================================================
    // Bootstrap and account completions
    // =========================================================================

    fn on_session_created(&mut self, result: Result<Value>) {
        match result.map(non_empty_string) {
            Ok(Some(session_id)) => {
                info!(session = %session_id, "Session created");
                self.session.set_session_id(session_id);
                self.after_session();
            }
            Ok(None) => self.fault("empty session id"),
            Err(e) => {
                error!(error = %e, "Failed to create session");
                self.fault("session creation failed");
            }
        }
    }

    fn on_config_retrieved(&mut self, result: Result<Value>) {
        match result {
            Ok(_) if !self.session.has_session() => self.restart_bootstrap(),
            Ok(config) => {
                let country = config
                    .get("country")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                debug!(country = %country, "Retrieved client configuration");
                self.session.set_country(country);
                self.update_token();
            }
            Err(e) => {
                error!(error = %e, "Failed to retrieve client configuration");
                self.fault("configuration retrieval failed");
            }
        }
    }

    fn on_token_updated(&mut self, result: Result<Value>) {
        match result.map(non_empty_string) {
            Ok(Some(_)) if !self.session.has_session() => self.restart_bootstrap(),
            Ok(Some(token)) => {
                debug!(lifetime = ?self.config.token_lifetime, "Communication token updated");
                self.session.set_token(token, self.config.token_lifetime);
                self.enter_connected();
            }
            Ok(None) => self.fault("empty communication token"),
            Err(e) => {
                error!(error = %e, "Failed to update communication token");
                self.fault("token update failed");
            }
        }
    }

    fn on_logged_in(
        &mut self,
        result: Result<Value>,
        reply: Option<oneshot::Sender<Result<String>>>,
    ) {
        let outcome = login_outcome(result);

        match &outcome {
            Ok(user_id) => {
                info!(user_id = %user_id, "Logged in");
                self.session.set_user_id(user_id.clone());
                self.login_finished(true);
            }
            Err(ClientError::Cancelled) => debug!("Login cancelled before dispatch"),
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.login_finished(false);
            }
        }

        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn on_logged_out(&mut self, result: Result<Value>, reply: oneshot::Sender<Result<()>>) {
        let outcome = result.map(|_| ());
        if outcome.is_ok() {
            info!("Logged out");
            self.login_finished(false);
        }
        let _ = reply.send(outcome);
    }

    // =========================================================================
    // Status
    // =========================================================================

    fn publish(&self) {
        let status = Status {
            phase: self.phase,
            session_id: self.session.session_id().to_string(),
            user_id: self.session.user_id().to_string(),
            logged_in: self.session.is_logged_in(),
            has_token: self.session.has_fresh_token(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        info!(deferred = self.deferred.len(), "Engine stopping");
        for call in std::mem::take(&mut self.deferred) {
            self.finish(call, Err(ClientError::Cancelled));
        }
    }
}

async fn token_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SESSION_ID_KEY, USER_ID_KEY};
    use serde_json::json;
    use std::time::Duration;

    const IDLE: Phase = Phase::Idle;
    const AUTHENTICATING: Phase = Phase::Connected(AuthState::Authenticating);
    const NOT_LOGGED_IN: Phase = Phase::Connected(AuthState::NotLoggedIn);
    const LOGGED_IN: Phase = Phase::Connected(AuthState::LoggedIn);

    #[test]
    fn test_system_calls_always_dispatch() {
        for phase in [
            IDLE,
            Phase::Connecting(ConnectingStep::CreatingSession),
            Phase::Connecting(ConnectingStep::UpdatingToken),
            AUTHENTICATING,
            NOT_LOGGED_IN,
            LOGGED_IN,
        ] {
            assert_eq!(admit(phase, CallKind::System, false), Admission::Dispatch);
        }
    }

    #[test]
    fn test_user_calls_defer_until_connected() {
        for auth in [false, true] {
            assert_eq!(admit(IDLE, CallKind::User, auth), Admission::Defer);
            assert_eq!(
                admit(
                    Phase::Connecting(ConnectingStep::RetrievingConfig),
                    CallKind::User,
                    auth
                ),
                Admission::Defer
            );
        }
    }

    #[test]
    fn test_auth_gating_in_connected() {
        assert_eq!(admit(AUTHENTICATING, CallKind::User, false), Admission::Dispatch);
        assert_eq!(admit(AUTHENTICATING, CallKind::User, true), Admission::Defer);

        assert_eq!(admit(NOT_LOGGED_IN, CallKind::User, false), Admission::Dispatch);
        assert_eq!(admit(NOT_LOGGED_IN, CallKind::User, true), Admission::Reject);

        assert_eq!(admit(LOGGED_IN, CallKind::User, false), Admission::Dispatch);
        assert_eq!(admit(LOGGED_IN, CallKind::User, true), Admission::Dispatch);
    }

    #[test]
    fn test_non_empty_string() {
        assert_eq!(non_empty_string(json!("abc")).as_deref(), Some("abc"));
        assert!(non_empty_string(json!("")).is_none());
        assert!(non_empty_string(json!(12)).is_none());
    }

    // =========================================================================
    // Engine transitions
    // =========================================================================

    /// An engine whose exchanges go nowhere; completions are fed by hand.
    fn engine(store: MemoryStore) -> Engine {
        let config = ClientConfig::new("http://127.0.0.1:9");
        let transport = Transport::new(&config.api_url, config.request_timeout).unwrap();
        Engine::new(config, transport, Arc::new(store)).0
    }

    fn user_call(method: &str, auth_required: bool) -> (PendingCall, oneshot::Receiver<Result<Value>>) {
        let (tx, rx) = oneshot::channel();
        let call = PendingCall::new(
            method,
            Params::new(),
            auth_required,
            CallKind::User,
            Completion::Caller(tx),
        );
        (call, rx)
    }

    #[tokio::test]
    async fn test_deferred_calls_dispatch_in_submission_order() {
        let mut engine = engine(MemoryStore::with_values([(SESSION_ID_KEY, "sess")]));

        let mut ids = Vec::new();
        for method in ["first", "second", "third"] {
            let (call, _rx) = user_call(method, false);
            ids.push(call.id);
            engine.submit(call);
        }
        assert_eq!(
            engine.phase,
            Phase::Connecting(ConnectingStep::RetrievingConfig)
        );
        let queued: Vec<u64> = engine.deferred.iter().map(|c| c.id).collect();
        assert_eq!(queued, ids);

        engine.on_config_retrieved(Ok(json!({ "country": { "ID": 1 } })));
        engine.on_token_updated(Ok(json!("token")));

        assert_eq!(engine.phase, NOT_LOGGED_IN);
        assert!(engine.deferred.is_empty());
        assert_eq!(
            engine.dispatched,
            [GET_CONFIG, GET_COMMUNICATION_TOKEN, "first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn test_auth_calls_wait_for_login_in_order() {
        let mut engine = engine(MemoryStore::with_values([
            (SESSION_ID_KEY, "sess"),
            (USER_ID_KEY, "42"),
        ]));

        for (method, auth) in [("a", true), ("b", false), ("c", true)] {
            engine.submit(user_call(method, auth).0);
        }
        engine.on_config_retrieved(Ok(json!({ "country": {} })));
        engine.on_token_updated(Ok(json!("token")));

        assert_eq!(engine.phase, AUTHENTICATING);
        let waiting: Vec<&str> = engine.deferred.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(waiting, ["a", "c"]);

        engine.on_logged_in(Ok(json!({ "userID": 42 })), None);

        assert_eq!(engine.phase, LOGGED_IN);
        assert_eq!(
            engine.dispatched[2..],
            ["authenticateAsAuthorizedUser", "b", "a", "c"]
        );
    }

    #[tokio::test]
    async fn test_session_cleared_during_token_update_restarts_bootstrap() {
        let mut engine = engine(MemoryStore::with_values([(SESSION_ID_KEY, "old")]));
        let (call, _rx) = user_call("other", false);
        engine.submit(call);
        engine.on_config_retrieved(Ok(json!({ "country": {} })));
        assert_eq!(engine.phase, Phase::Connecting(ConnectingStep::UpdatingToken));

        // A call from the previous connection reports the session invalid
        // while the token request is still out.
        engine.raise(Signal::SessionInvalid, engine.generation);
        engine.on_token_updated(Ok(json!("token-for-old-session")));

        assert_eq!(
            engine.phase,
            Phase::Connecting(ConnectingStep::CreatingSession)
        );
        assert!(!engine.session.has_fresh_token());
        assert_eq!(engine.deferred.len(), 1);
        assert_eq!(engine.dispatched.last().map(String::as_str), Some(INITIATE_SESSION));

        engine.on_session_created(Ok(json!("new")));
        engine.on_config_retrieved(Ok(json!({ "country": {} })));
        engine.on_token_updated(Ok(json!("token")));

        assert_eq!(engine.phase, NOT_LOGGED_IN);
        assert_eq!(engine.session.session_id(), "new");
        assert_eq!(engine.dispatched.last().map(String::as_str), Some("other"));
    }

    #[tokio::test]
    async fn test_session_cleared_during_config_restarts_bootstrap() {
        let mut engine = engine(MemoryStore::with_values([(SESSION_ID_KEY, "old")]));
        engine.submit(user_call("other", false).0);

        engine.raise(Signal::SessionInvalid, engine.generation);
        engine.on_config_retrieved(Ok(json!({ "country": { "ID": 7 } })));

        assert_eq!(
            engine.phase,
            Phase::Connecting(ConnectingStep::CreatingSession)
        );
        assert!(engine.session.country().is_none());
    }

    #[tokio::test]
    async fn test_stale_token_fault_is_ignored() {
        let mut engine = engine(MemoryStore::new());
        engine.session.set_session_id("sess".to_string());
        engine.session.set_token("token".to_string(), Duration::from_secs(60));
        engine.generation = 2;
        engine.set_phase(LOGGED_IN);

        engine.raise(Signal::TokenInvalid, 1);
        assert_eq!(engine.phase, LOGGED_IN);
        assert!(engine.session.has_fresh_token());

        engine.raise(Signal::SessionInvalid, 1);
        assert_eq!(engine.session.session_id(), "sess");

        engine.raise(Signal::TokenInvalid, 2);
        assert_eq!(engine.phase, IDLE);
        assert!(!engine.session.has_fresh_token());
    }
}
