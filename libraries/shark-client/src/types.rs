//! Types for Shark API requests, responses and client state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://grooveshark.com";

/// Per-call deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// How long a communication token is trusted after it was issued.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(600);

/// Ordered call parameters.
pub type Params = serde_json::Map<String, Value>;

// Bootstrap and account methods driven by the engine itself.
pub(crate) const INITIATE_SESSION: &str = "initiateSession";
pub(crate) const GET_CONFIG: &str = "getGSConfig";
pub(crate) const GET_COMMUNICATION_TOKEN: &str = "getCommunicationToken";
pub(crate) const AUTHENTICATE_AS_AUTHORIZED_USER: &str = "authenticateAsAuthorizedUser";
pub(crate) const AUTHENTICATE_USER: &str = "authenticateUser";
pub(crate) const LOGOUT_USER: &str = "logoutUser";

// =============================================================================
// Configuration
// =============================================================================

/// Client identity sent in every request header.
///
/// The salt feeds the per-call request token; the server rejects tokens
/// minted with a salt that does not match the announced client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPreset {
    pub client: String,
    pub client_revision: u32,
    pub salt: String,
}

impl ClientPreset {
    /// Web player identity. This is the default.
    pub fn html() -> Self {
        Self {
            client: "htmlshark".to_string(),
            client_revision: 20130520,
            salt: "nuggetsOfBaller".to_string(),
        }
    }

    /// Queue widget identity.
    pub fn js() -> Self {
        Self {
            client: "jsqueue".to_string(),
            client_revision: 20130520,
            salt: "nuggetsOfBaller".to_string(),
        }
    }

    /// Mobile web identity.
    pub fn mobile() -> Self {
        Self {
            client: "mobileshark".to_string(),
            client_revision: 20120830,
            salt: "gooeyFlubber".to_string(),
        }
    }
}

impl Default for ClientPreset {
    fn default() -> Self {
        Self::html()
    }
}

/// Configuration for a [`SharkClient`](crate::SharkClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "https://grooveshark.com")
    pub api_url: String,
    /// Client identity and token salt
    pub preset: ClientPreset,
    /// Deadline for a single HTTP exchange
    pub request_timeout: Duration,
    /// Lifetime of a communication token before it must be refreshed
    pub token_lifetime: Duration,
}

impl ClientConfig {
    /// Create a config for the given API URL with default timings.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            preset: ClientPreset::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    pub fn with_preset(mut self, preset: ClientPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Whether a call is part of the session bootstrap or issued by the application.
///
/// System calls are never deferred and never auth-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    System,
    User,
}

/// Steps of the Connecting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectingStep {
    CreatingSession,
    RetrievingConfig,
    UpdatingToken,
}

/// Authentication sub-state of the Connected phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticating,
    NotLoggedIn,
    LoggedIn,
}

/// The connection phase. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting(ConnectingStep),
    Connected(AuthState),
}

impl Phase {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting(ConnectingStep::CreatingSession) => write!(f, "creating-session"),
            Self::Connecting(ConnectingStep::RetrievingConfig) => write!(f, "retrieving-config"),
            Self::Connecting(ConnectingStep::UpdatingToken) => write!(f, "updating-token"),
            Self::Connected(AuthState::Authenticating) => write!(f, "authenticating"),
            Self::Connected(AuthState::NotLoggedIn) => write!(f, "ready-not-logged-in"),
            Self::Connected(AuthState::LoggedIn) => write!(f, "ready-logged-in"),
        }
    }
}

/// Snapshot of the client published after every engine event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub phase: Phase,
    pub session_id: String,
    pub user_id: String,
    pub logged_in: bool,
    /// A communication token is held and its freshness timer is running
    pub has_token: bool,
}

// =============================================================================
// Wire Envelopes
// =============================================================================

/// Body of every outgoing POST.
#[derive(Debug, Serialize)]
pub(crate) struct RequestEnvelope<'a> {
    pub method: &'a str,
    pub parameters: &'a Params,
    pub header: RequestHeader<'a>,
}

/// Per-call header identifying client, session and device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestHeader<'a> {
    pub client: &'a str,
    pub client_revision: u32,
    pub token: String,
    pub country: &'a Value,
    pub session: &'a str,
    pub privacy: u8,
    pub uuid: &'a str,
}

/// Body of every response: either a result or a fault.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub fault: Option<Fault>,
}

/// Server-side fault descriptor. A fault without a code carries nothing
/// to act on.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Fault {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}
