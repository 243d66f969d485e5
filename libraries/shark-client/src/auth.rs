//! Account calls: login, automatic re-authentication and logout.

use crate::call::{Completion, PendingCall};
use crate::error::{ClientError, Result};
use crate::types::{
    CallKind, Params, AUTHENTICATE_AS_AUTHORIZED_USER, AUTHENTICATE_USER, LOGOUT_USER,
};
use serde_json::Value;
use tokio::sync::oneshot;

/// Login with username and password.
pub(crate) fn login_call(
    username: String,
    password: String,
    reply: oneshot::Sender<Result<String>>,
) -> PendingCall {
    let mut params = Params::new();
    params.insert("username".into(), Value::String(username));
    params.insert("password".into(), Value::String(password));
    PendingCall::new(
        AUTHENTICATE_USER,
        params,
        false,
        CallKind::User,
        Completion::LoggedIn(Some(reply)),
    )
}

/// Re-authenticate the cached user on a fresh connection.
pub(crate) fn authenticate_call(user_id: &str) -> PendingCall {
    let mut params = Params::new();
    params.insert("userID".into(), Value::String(user_id.to_string()));
    PendingCall::new(
        AUTHENTICATE_AS_AUTHORIZED_USER,
        params,
        false,
        CallKind::User,
        Completion::LoggedIn(None),
    )
}

pub(crate) fn logout_call(reply: oneshot::Sender<Result<()>>) -> PendingCall {
    PendingCall::new(
        LOGOUT_USER,
        Params::new(),
        false,
        CallKind::User,
        Completion::LoggedOut(reply),
    )
}

/// Interpret a login result. Missing or zero `userID` means the
/// credentials were rejected.
pub(crate) fn login_outcome(result: Result<Value>) -> Result<String> {
    result.and_then(|value| {
        user_id_of(&value)
            .ok_or_else(|| ClientError::LoginFailed("Invalid username and/or password".into()))
    })
}

fn user_id_of(result: &Value) -> Option<String> {
    match result.get("userID")? {
        Value::Number(n) => (n.as_i64()? != 0).then(|| n.to_string()),
        Value::String(s) => (s.parse::<i64>().ok()? != 0).then(|| s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_id_of() {
        assert_eq!(user_id_of(&json!({"userID": 42})).as_deref(), Some("42"));
        assert_eq!(user_id_of(&json!({"userID": "42"})).as_deref(), Some("42"));
        assert!(user_id_of(&json!({"userID": 0})).is_none());
        assert!(user_id_of(&json!({"userID": "0"})).is_none());
        assert!(user_id_of(&json!({"userID": "abc"})).is_none());
        assert!(user_id_of(&json!({})).is_none());
        assert!(user_id_of(&Value::Null).is_none());
    }

    #[test]
    fn test_login_outcome() {
        assert_eq!(login_outcome(Ok(json!({"userID": 7}))).unwrap(), "7");

        match login_outcome(Ok(json!({"userID": 0}))) {
            Err(ClientError::LoginFailed(msg)) => assert!(msg.contains("password")),
            other => panic!("Expected LoginFailed, got: {:?}", other),
        }

        assert!(matches!(
            login_outcome(Err(ClientError::HttpTimeout)),
            Err(ClientError::HttpTimeout)
        ));
    }

    #[test]
    fn test_login_call_shape() {
        let (tx, _rx) = oneshot::channel();
        let call = login_call("user".into(), "secret".into(), tx);

        assert_eq!(call.method, AUTHENTICATE_USER);
        assert_eq!(call.kind, CallKind::User);
        assert!(!call.auth_required);
        assert_eq!(call.params["username"], "user");
        assert_eq!(call.params["password"], "secret");
    }

    #[test]
    fn test_authenticate_call_shape() {
        let call = authenticate_call("42");
        assert_eq!(call.method, AUTHENTICATE_AS_AUTHORIZED_USER);
        assert_eq!(call.params["userID"], "42");
        assert!(matches!(call.completion, Completion::LoggedIn(None)));
    }
}
