//! Outstanding calls and the handles callers await them through.

use crate::error::{ClientError, ErrorCode, Result};
use crate::types::{CallKind, Params};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Automatic resends allowed per call across all recoveries.
pub(crate) const MAX_RESENDS: u8 = 2;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Who is told when a call finishes.
///
/// Application calls report to a caller; bootstrap and account calls
/// feed their result back into the engine.
pub(crate) enum Completion {
    Caller(oneshot::Sender<Result<Value>>),
    SessionCreated,
    ConfigRetrieved,
    TokenUpdated,
    LoggedIn(Option<oneshot::Sender<Result<String>>>),
    LoggedOut(oneshot::Sender<Result<()>>),
}

/// One remote call from submission until it completes.
pub(crate) struct PendingCall {
    pub id: u64,
    pub method: String,
    pub params: Params,
    pub auth_required: bool,
    pub kind: CallKind,
    pub completion: Completion,
    /// Connection generation the call was last dispatched under
    pub generation: u64,
    last_recovery: Option<ErrorCode>,
    resends: u8,
}

impl PendingCall {
    pub fn new(
        method: impl Into<String>,
        params: Params,
        auth_required: bool,
        kind: CallKind,
        completion: Completion,
    ) -> Self {
        Self {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            method: method.into(),
            params,
            auth_required,
            kind,
            completion,
            generation: 0,
            last_recovery: None,
            resends: 0,
        }
    }

    /// Record a recovery-driven resend. Returns `false` when the call already
    /// failed this way on its previous attempt or has used its resend budget;
    /// the failure must then be surfaced.
    pub fn try_resend(&mut self, reason: ErrorCode) -> bool {
        if self.last_recovery == Some(reason) || self.resends >= MAX_RESENDS {
            return false;
        }
        self.last_recovery = Some(reason);
        self.resends += 1;
        true
    }

    pub fn resends(&self) -> u8 {
        self.resends
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("auth_required", &self.auth_required)
            .field("kind", &self.kind)
            .field("resends", &self.resends)
            .finish_non_exhaustive()
    }
}

/// Handle to a submitted call.
///
/// Await it to receive the single completion: the result payload or a
/// terminal error. Dropping the handle does not cancel the call.
#[derive(Debug)]
pub struct CallHandle {
    id: u64,
    method: String,
    rx: oneshot::Receiver<Result<Value>>,
}

impl CallHandle {
    pub(crate) fn new(id: u64, method: String, rx: oneshot::Receiver<Result<Value>>) -> Self {
        Self { id, method, rx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Future for CallHandle {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the engine went away with the call.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Cancelled)))
    }
}
