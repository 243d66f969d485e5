//! Classification of finished HTTP exchanges.

use crate::error::{ClientError, ErrorCode};
use crate::types::{CallKind, ResponseEnvelope};
use serde_json::Value;
use tracing::warn;

/// Raw outcome of one HTTP exchange.
#[derive(Debug)]
pub(crate) enum Exchange {
    Response { status: u16, body: Vec<u8> },
    TimedOut,
    Failed(String),
}

/// Recovery the engine must perform for a classified exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// Token rejected: stop the freshness timer and refresh it.
    TokenInvalid,
    /// Session rejected: forget it and reconnect from scratch.
    SessionInvalid,
    /// Server says the user is not logged in.
    LoggedOut,
}

/// What happens to the call itself.
#[derive(Debug)]
pub(crate) enum Outcome {
    Success(Value),
    Resend { code: ErrorCode, message: String },
    Fail(ClientError),
}

#[derive(Debug)]
pub(crate) struct Verdict {
    pub outcome: Outcome,
    pub signal: Option<Signal>,
}

impl Verdict {
    fn success(value: Value) -> Self {
        Self {
            outcome: Outcome::Success(value),
            signal: None,
        }
    }

    fn fail(error: ClientError) -> Self {
        Self {
            outcome: Outcome::Fail(error),
            signal: None,
        }
    }
}

/// Decide the fate of a call from its exchange.
///
/// Transport failures are terminal. Token faults always resend; session
/// faults resend only application calls, since a broken bootstrap cannot
/// recover itself. Unlisted fault codes pass the envelope's result through.
pub(crate) fn classify(kind: CallKind, method: &str, exchange: Exchange) -> Verdict {
    let body = match exchange {
        Exchange::TimedOut => return Verdict::fail(ClientError::HttpTimeout),
        Exchange::Failed(message) => return Verdict::fail(ClientError::Http(message)),
        Exchange::Response { status, .. } if status != 200 => {
            return Verdict::fail(ClientError::Http(format!("HTTP status {}", status)));
        }
        Exchange::Response { body, .. } => body,
    };

    let envelope: ResponseEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Verdict::fail(ClientError::Parse(format!(
                "Failed to parse {} result: {}",
                method, e
            )));
        }
    };

    let Some((fault_code, message)) = envelope
        .fault
        .and_then(|fault| Some((fault.code?, fault.message)))
    else {
        return Verdict::success(envelope.result);
    };

    match ErrorCode::from_code(fault_code) {
        Some(code @ ErrorCode::InvalidToken) => Verdict {
            outcome: Outcome::Resend {
                code,
                message,
            },
            signal: Some(Signal::TokenInvalid),
        },
        Some(code @ (ErrorCode::InvalidSession | ErrorCode::FetchingToken)) => {
            let outcome = match kind {
                CallKind::System => Outcome::Fail(ClientError::from_fault(code, message)),
                CallKind::User => Outcome::Resend {
                    code,
                    message,
                },
            };
            Verdict {
                outcome,
                signal: Some(Signal::SessionInvalid),
            }
        }
        Some(code @ ErrorCode::MustBeLoggedIn) => Verdict {
            outcome: Outcome::Fail(ClientError::from_fault(code, message)),
            signal: Some(Signal::LoggedOut),
        },
        other => {
            warn!(
                method = %method,
                code = fault_code,
                known = ?other,
                message = %message,
                "Ignoring server fault"
            );
            Verdict::success(envelope.result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> Exchange {
        Exchange::Response {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    fn fault(code: i64) -> Exchange {
        response(&format!(
            r#"{{"fault": {{"code": {}, "message": "fault {}"}}}}"#,
            code, code
        ))
    }

    #[test]
    fn test_success_extracts_result() {
        let verdict = classify(CallKind::User, "m", response(r#"{"result": {"songs": []}}"#));
        match verdict.outcome {
            Outcome::Success(value) => assert_eq!(value, serde_json::json!({"songs": []})),
            other => panic!("Expected Success, got: {:?}", other),
        }
        assert!(verdict.signal.is_none());
    }

    #[test]
    fn test_http_status_is_terminal() {
        let verdict = classify(
            CallKind::User,
            "m",
            Exchange::Response {
                status: 503,
                body: Vec::new(),
            },
        );
        match verdict.outcome {
            Outcome::Fail(ClientError::Http(msg)) => assert!(msg.contains("503")),
            other => panic!("Expected Http failure, got: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_and_transport_failure() {
        assert!(matches!(
            classify(CallKind::User, "m", Exchange::TimedOut).outcome,
            Outcome::Fail(ClientError::HttpTimeout)
        ));
        assert!(matches!(
            classify(CallKind::User, "m", Exchange::Failed("refused".into())).outcome,
            Outcome::Fail(ClientError::Http(_))
        ));
    }

    #[test]
    fn test_unparseable_body() {
        let verdict = classify(CallKind::User, "m", response("<html>"));
        assert!(matches!(verdict.outcome, Outcome::Fail(ClientError::Parse(_))));
    }

    #[test]
    fn test_invalid_token_resends_any_kind() {
        for kind in [CallKind::User, CallKind::System] {
            let verdict = classify(kind, "m", fault(256));
            assert!(matches!(
                verdict.outcome,
                Outcome::Resend {
                    code: ErrorCode::InvalidToken,
                    ..
                }
            ));
            assert_eq!(verdict.signal, Some(Signal::TokenInvalid));
        }
    }

    #[test]
    fn test_invalid_session_depends_on_kind() {
        let user = classify(CallKind::User, "m", fault(16));
        assert!(matches!(user.outcome, Outcome::Resend { .. }));
        assert_eq!(user.signal, Some(Signal::SessionInvalid));

        let system = classify(CallKind::System, "m", fault(16));
        assert!(matches!(
            system.outcome,
            Outcome::Fail(ClientError::InvalidSession(_))
        ));
        assert_eq!(system.signal, Some(Signal::SessionInvalid));

        let fetching = classify(CallKind::System, "m", fault(0));
        assert!(matches!(
            fetching.outcome,
            Outcome::Fail(ClientError::FetchingToken(_))
        ));
    }

    #[test]
    fn test_must_be_logged_in() {
        let verdict = classify(CallKind::User, "m", fault(8));
        match verdict.outcome {
            Outcome::Fail(ClientError::MustBeLoggedIn(msg)) => assert_eq!(msg, "fault 8"),
            other => panic!("Expected MustBeLoggedIn, got: {:?}", other),
        }
        assert_eq!(verdict.signal, Some(Signal::LoggedOut));
    }

    #[test]
    fn test_other_faults_pass_through() {
        for code in [10, 512, 1024, 9999] {
            let verdict = classify(CallKind::User, "m", fault(code));
            match verdict.outcome {
                Outcome::Success(value) => assert!(value.is_null()),
                other => panic!("Expected Success for code {}, got: {:?}", code, other),
            }
            assert!(verdict.signal.is_none());
        }
    }

    #[test]
    fn test_fault_without_code_is_absent() {
        for body in [
            r#"{"result": [1], "fault": {}}"#,
            r#"{"result": [1], "fault": {"message": "no code"}}"#,
            r#"{"result": [1], "fault": null}"#,
        ] {
            let verdict = classify(CallKind::User, "m", response(body));
            match verdict.outcome {
                Outcome::Success(value) => assert_eq!(value, serde_json::json!([1])),
                other => panic!("Expected Success for {}, got: {:?}", body, other),
            }
            assert!(verdict.signal.is_none());
        }
    }
}
