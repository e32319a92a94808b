//! Sensitive-value redaction for logged payloads.
//!
//! Any field whose key name looks credential-shaped has its value replaced
//! with a fixed marker, recursively through nested objects and arrays. Both
//! logging paths (success and error) go through here; there is no way to
//! opt out.

use once_cell::sync::Lazy;
use serde_json::Value;

pub const REDACTION_MARKER: &str = "[REDACTED]";

static SENSITIVE_FRAGMENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "password", "passwd", "pwd", "secret", "token", "auth", "jwt", "bearer", "credit",
        "card", "ssn", "cvv",
    ]
});

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "key"
        || key.ends_with("key")
        || SENSITIVE_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

/// Replace sensitive values in-place, leaving all other fields untouched.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *entry = Value::String(REDACTION_MARKER.to_string());
                } else {
                    redact(entry);
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries.iter_mut() {
                redact(entry);
            }
        }
        _ => {}
    }
}

/// Best-effort decode of a response body for diagnostic logging. Non-JSON
/// bodies are skipped rather than logged raw.
pub fn redacted_json(bytes: &[u8]) -> Option<Value> {
    let mut value: Value = serde_json::from_slice(bytes).ok()?;
    redact(&mut value);
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_keys_are_masked_at_any_depth() {
        let mut payload = json!({
            "username": "alice",
            "password": "secret123",
            "profile": {
                "Authorization": "Bearer abc",
                "nested": [{"api_key": "xyz", "note": "keep me"}],
            },
        });
        redact(&mut payload);

        assert_eq!(payload["password"], REDACTION_MARKER);
        assert_eq!(payload["profile"]["Authorization"], REDACTION_MARKER);
        assert_eq!(payload["profile"]["nested"][0]["api_key"], REDACTION_MARKER);
        // Non-sensitive siblings are untouched
        assert_eq!(payload["username"], "alice");
        assert_eq!(payload["profile"]["nested"][0]["note"], "keep me");
    }

    #[test]
    fn close_variants_are_caught() {
        for key in [
            "hashed_password",
            "ACCESS_TOKEN",
            "jwtSignature",
            "client_secret",
            "ssn",
            "cvv",
            "credit_card_number",
            "ApiKey",
        ] {
            let mut payload = json!({ key: "value" });
            redact(&mut payload);
            assert_eq!(payload[key], REDACTION_MARKER, "key {} not redacted", key);
        }
    }

    #[test]
    fn plain_fields_survive() {
        let mut payload = json!({"title": "groceries", "count": 3, "done": false});
        let expected = payload.clone();
        redact(&mut payload);
        assert_eq!(payload, expected);
    }

    #[test]
    fn non_json_bodies_are_skipped() {
        assert!(redacted_json(b"<html>hi</html>").is_none());
    }
}
