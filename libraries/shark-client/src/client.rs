//! Main Shark client handle.

use crate::call::{CallHandle, Completion, PendingCall};
use crate::engine::{Command, Engine};
use crate::error::{ClientError, Result};
use crate::store::SettingsStore;
use crate::transport::Transport;
use crate::types::{CallKind, ClientConfig, Params, Status};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

/// Client for the Shark API.
///
/// The client establishes a session, keeps the communication token fresh
/// and authenticates a cached user on its own. Calls submitted before the
/// connection is ready are held and sent once it is; calls that hit an
/// expired token or session are resent after recovery.
///
/// Handles are cheap to clone. The background engine stops when the last
/// handle is dropped, cancelling any calls still waiting for a connection.
///
/// # Example
///
/// ```ignore
/// use shark_client::{ClientConfig, MemoryStore, SharkClient};
/// use std::sync::Arc;
///
/// let client = SharkClient::new(ClientConfig::default(), Arc::new(MemoryStore::new()))?;
///
/// let mut params = shark_client::Params::new();
/// params.insert("query".into(), "test".into());
/// let songs = client.call("getResultsFromSearch", params, false).await?;
/// ```
#[derive(Clone)]
pub struct SharkClient {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<Status>,
}

impl SharkClient {
    /// Create a client and start its engine.
    ///
    /// Persisted session and user ids are read from `store`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(config: ClientConfig, store: Arc<dyn SettingsStore>) -> Result<Self> {
        let config = ClientConfig {
            api_url: normalize_url(&config.api_url)?,
            ..config
        };

        let transport = Transport::new(&config.api_url, config.request_timeout)?;
        let (engine, commands, status) = Engine::new(config, transport, store);
        tokio::spawn(engine.run());

        Ok(Self { commands, status })
    }

    /// Submit a call. The returned handle resolves exactly once.
    ///
    /// Calls with `auth_required` are rejected with
    /// [`ClientError::Cancelled`] while no user is logged in.
    pub fn submit(
        &self,
        method: impl Into<String>,
        params: Params,
        auth_required: bool,
    ) -> CallHandle {
        let (tx, rx) = oneshot::channel();
        let call = PendingCall::new(
            method,
            params,
            auth_required,
            CallKind::User,
            Completion::Caller(tx),
        );
        let handle = CallHandle::new(call.id, call.method.clone(), rx);

        debug!(id = call.id, method = %call.method, auth_required, "Submitting call");
        // On failure the call, and its sender, drop: the handle reports Cancelled.
        let _ = self.commands.send(Command::Submit(call));

        handle
    }

    /// Submit a call and wait for its result.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: Params,
        auth_required: bool,
    ) -> Result<Value> {
        self.submit(method, params, auth_required).await
    }

    /// Log in with username and password. Returns the user id.
    ///
    /// On success the user id is cached for automatic authentication on
    /// later connections.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
                reply,
            })
            .map_err(|_| ClientError::Cancelled)?;
        rx.await.unwrap_or(Err(ClientError::Cancelled))
    }

    /// Forget the cached user and end the server-side login.
    pub async fn logout(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Logout(reply))
            .map_err(|_| ClientError::Cancelled)?;
        rx.await.unwrap_or(Err(ClientError::Cancelled))
    }

    /// Latest status snapshot.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Check if a user is logged in.
    pub fn is_logged_in(&self) -> bool {
        self.status.borrow().logged_in
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    /// Wait until the status satisfies `predicate`.
    ///
    /// Returns the last known status if the engine stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&Status) -> bool) -> Status {
        let mut status = self.status.clone();
        let result = status.wait_for(predicate).await.map(|s| s.clone());
        result.unwrap_or_else(|_| status.borrow().clone())
    }
}

/// Validate and normalize an API base URL.
fn normalize_url(url: &str) -> Result<String> {
    if url.is_empty() {
        return Err(ClientError::InvalidUrl("URL cannot be empty".into()));
    }

    let url = url.trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ClientError::InvalidUrl("URL must have a host".into()));
    }

    Ok(url.to_string())
}
