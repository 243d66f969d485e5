//! Shark Client
//!
//! Session and authentication engine for the Shark JSON-over-HTTP API.
//!
//! # Features
//!
//! - **Session bootstrap**: creates a session, fetches the client
//!   configuration and a communication token before any call goes out
//! - **Token freshness**: refreshes the communication token when it expires
//!   or the server rejects it, then resends the affected calls
//! - **Authentication**: re-authenticates a cached user automatically,
//!   explicit login and logout
//! - **Call admission**: calls made before the connection is ready are held
//!   and released in order; auth-only calls are refused while logged out
//!
//! # Example
//!
//! ```ignore
//! use shark_client::{ClientConfig, FileStore, Params, SharkClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileStore::open("shark.json")?);
//!     let client = SharkClient::new(ClientConfig::default(), store)?;
//!
//!     // Login
//!     let user_id = client.login("user", "password").await?;
//!     println!("Logged in as {}", user_id);
//!
//!     // Search
//!     let mut params = Params::new();
//!     params.insert("query".into(), "test".into());
//!     let result = client.call("getResultsFromSearch", params, false).await?;
//!     println!("{}", result);
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod call;
mod classify;
mod client;
mod engine;
mod error;
mod session;
mod store;
mod token;
mod transport;
mod types;

// Re-export main types
pub use call::CallHandle;
pub use client::SharkClient;
pub use error::{ClientError, ErrorCode, Result};
pub use store::{FileStore, MemoryStore, SettingsStore, SESSION_ID_KEY, USER_ID_KEY};
pub use token::TokenMinter;
pub use types::{
    AuthState, CallKind, ClientConfig, ClientPreset, ConnectingStep, Params, Phase, Status,
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TOKEN_LIFETIME,
};
