//! Command helpers shared by the binary.

use crate::error::{CliError, Result};
use serde_json::Value;
use shark_client::{Params, Status};

/// Parse `key=value` pairs into call parameters.
///
/// Values that parse as JSON (numbers, booleans, arrays, objects) are kept
/// as such; anything else is sent as a string.
pub fn parse_params(pairs: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::InvalidParam(format!("expected key=value, got '{}'", pair)))?;
        if key.is_empty() {
            return Err(CliError::InvalidParam(format!("empty key in '{}'", pair)));
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(params)
}

pub fn search_params(query: &str) -> Params {
    let mut params = Params::new();
    params.insert("query".into(), Value::String(query.to_string()));
    params.insert("type".into(), Value::String("Songs".to_string()));
    params
}

pub fn format_status(status: &Status) -> String {
    let or_none = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    format!(
        "phase:      {}\nsession:    {}\nuser:       {}\nlogged in:  {}\ntoken:      {}",
        status.phase,
        or_none(&status.session_id),
        or_none(&status.user_id),
        status.logged_in,
        if status.has_token { "fresh" } else { "none" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shark_client::Phase;

    #[test]
    fn test_parse_params() {
        let params = parse_params(&[
            "query=daft punk".to_string(),
            "page=2".to_string(),
            "ids=[1,2]".to_string(),
            "flag=true".to_string(),
        ])
        .unwrap();

        assert_eq!(params["query"], "daft punk");
        assert_eq!(params["page"], 2);
        assert_eq!(params["ids"], json!([1, 2]));
        assert_eq!(params["flag"], true);
    }

    #[test]
    fn test_parse_params_keeps_equals_in_value() {
        let params = parse_params(&["q=a=b".to_string()]).unwrap();
        assert_eq!(params["q"], "a=b");
    }

    #[test]
    fn test_parse_params_rejects_malformed() {
        assert!(matches!(
            parse_params(&["novalue".to_string()]),
            Err(CliError::InvalidParam(_))
        ));
        assert!(matches!(
            parse_params(&["=value".to_string()]),
            Err(CliError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_format_status() {
        let status = Status {
            phase: Phase::Idle,
            session_id: "abc".to_string(),
            user_id: String::new(),
            logged_in: false,
            has_token: false,
        };
        let text = format_status(&status);
        assert!(text.contains("idle"));
        assert!(text.contains("abc"));
        assert!(text.contains("user:       -"));
        assert!(text.contains("none"));
    }
}
