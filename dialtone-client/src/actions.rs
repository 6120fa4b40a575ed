//! Mutating operations — every one validates its input, confirms the
//! session, stamps the request with the anti-forgery token, and checks the
//! response's embedded `ok` flag. Validation and the auth check both happen
//! before any bytes leave the machine.

use serde_json::Value;

use crate::envelope;
use crate::errors::{BackendError, RemoteError};
use crate::Client;

/// Empirically ambiguous rejection code; almost always a missing or invalid
/// callback number on the account.
const CODE_BAD_CALLBACK: i64 = 20;

/// Syntactic phone-number check: an optional single leading `+`, then at
/// least ten ASCII digits, nothing else.
pub fn is_valid_number(number: &str) -> bool {
    let digits = number.strip_prefix('+').unwrap_or(number);
    digits.len() >= 10 && digits.bytes().all(|b| b.is_ascii_digit())
}

fn validate_number(number: &str) -> Result<(), BackendError> {
    if is_valid_number(number) {
        Ok(())
    } else {
        Err(BackendError::Validation(format!("malformed phone number: {number:?}")))
    }
}

impl Client {
    // ── Calls ──────────────────────────────────────────────────────────────

    /// Ask the service to connect `number` to the configured callback
    /// number (the service rings the callback first).
    pub async fn call(&mut self, number: &str) -> Result<(), BackendError> {
        validate_number(number)?;
        self.require_callback_number()?;
        let form = vec![
            ("outgoingNumber", number.to_string()),
            ("forwardingNumber", self.session.callback_number.clone()),
            ("subscriberNumber", "undefined".to_string()),
            ("remember", "0".to_string()),
        ];
        self.post_action(&self.config.endpoints.call_connect, form).await?;
        Ok(())
    }

    /// Cancel a call placed with [`Client::call`] that hasn't connected yet.
    pub async fn cancel_call(&mut self) -> Result<(), BackendError> {
        self.require_callback_number()?;
        let form = vec![
            ("outgoingNumber", "undefined".to_string()),
            ("forwardingNumber", "undefined".to_string()),
            ("cancelType", "C2C".to_string()),
        ];
        self.post_action(&self.config.endpoints.call_cancel, form).await?;
        Ok(())
    }

    // ── SMS ────────────────────────────────────────────────────────────────

    pub async fn send_sms(&mut self, number: &str, text: &str) -> Result<(), BackendError> {
        self.send_sms_to_many(&[number], text).await
    }

    /// Send one text to several recipients; the wire format wants them as a
    /// single comma-joined field.
    pub async fn send_sms_to_many(
        &mut self,
        numbers: &[&str],
        text: &str,
    ) -> Result<(), BackendError> {
        if numbers.is_empty() {
            return Err(BackendError::Validation("no recipients".into()));
        }
        for number in numbers {
            validate_number(number)?;
        }
        let form = vec![
            ("phoneNumber", numbers.join(",")),
            ("text", text.to_string()),
        ];
        self.post_action(&self.config.endpoints.sms_send, form).await?;
        Ok(())
    }

    // ── Conversation state ─────────────────────────────────────────────────

    pub async fn mark_read(&mut self, message_id: &str, read: bool) -> Result<(), BackendError> {
        require_id(message_id)?;
        let form = vec![
            ("messages", message_id.to_string()),
            ("read", flag(read)),
        ];
        self.post_action(&self.config.endpoints.mark, form).await?;
        Ok(())
    }

    pub async fn archive(&mut self, message_id: &str, archived: bool) -> Result<(), BackendError> {
        require_id(message_id)?;
        let form = vec![
            ("messages", message_id.to_string()),
            ("archive", flag(archived)),
        ];
        self.post_action(&self.config.endpoints.archive, form).await?;
        Ok(())
    }

    // ── Account settings ───────────────────────────────────────────────────

    pub async fn set_dnd(&mut self, enabled: bool) -> Result<(), BackendError> {
        let form = vec![("doNotDisturb", flag(enabled))];
        self.post_action(&self.config.endpoints.dnd, form).await?;
        Ok(())
    }

    /// Change the number the service rings back, and remember it locally
    /// once the service accepts it.
    pub async fn set_callback_number(&mut self, number: &str) -> Result<(), BackendError> {
        validate_number(number)?;
        let form = vec![("phoneNumber", number.to_string())];
        self.post_action(&self.config.endpoints.forwarding, form).await?;
        self.session.callback_number = number.to_string();
        Ok(())
    }

    // ── Shared plumbing ────────────────────────────────────────────────────

    fn require_token(&self) -> Result<String, BackendError> {
        self.session
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendError::Authentication("not logged in".into()))
    }

    fn require_callback_number(&self) -> Result<(), BackendError> {
        if self.session.callback_number.is_empty() {
            return Err(BackendError::Validation(
                "no callback number configured; pick one with set_callback_number()".into(),
            ));
        }
        Ok(())
    }

    async fn post_action(
        &self,
        url: &str,
        mut form: Vec<(&str, String)>,
    ) -> Result<Value, BackendError> {
        let token = self.require_token()?;
        form.push((self.config.login.session_token_field.as_str(), token));
        let body = self.transport.fetch(url, Some(&form), None).await?;
        check_ok(&body, &self.session.callback_number)
    }
}

fn flag(on: bool) -> String {
    (if on { "1" } else { "0" }).to_string()
}

fn require_id(message_id: &str) -> Result<(), BackendError> {
    if message_id.is_empty() {
        return Err(BackendError::Validation("empty message id".into()));
    }
    Ok(())
}

/// Decode an action response and translate its embedded status.
fn check_ok(raw: &[u8], callback_number: &str) -> Result<Value, BackendError> {
    let text = String::from_utf8_lossy(raw);
    let json = match envelope::parse_json_lenient(&text) {
        Ok(v) => v,
        Err(_) => {
            return Err(RemoteError { code: None, hint: None, raw: text.into_owned() }.into());
        }
    };

    if json.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(json);
    }

    let code = json
        .get("data")
        .and_then(|d| d.get("code"))
        .and_then(Value::as_i64);
    let hint = match code {
        Some(CODE_BAD_CALLBACK) if callback_number.is_empty() => Some(
            "rejected with code 20; no callback number is configured — set one and retry"
                .to_string(),
        ),
        Some(CODE_BAD_CALLBACK) => Some(format!(
            "rejected with code 20; the callback number {callback_number:?} is probably missing \
             from or invalid on the account"
        )),
        _ => None,
    };
    Err(RemoteError { code, hint, raw: text.into_owned() }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceConfig;

    fn client() -> Client {
        let jar = std::env::temp_dir().join("dialtone-actions-test-jar.json");
        Client::open(ServiceConfig::default(), jar).unwrap()
    }

    #[test]
    fn number_validation_accepts_ten_plus_digits() {
        assert!(is_valid_number("5550001111"));
        assert!(is_valid_number("+15550001111"));
        assert!(is_valid_number("005550001111222"));
    }

    #[test]
    fn number_validation_rejects_everything_else() {
        assert!(!is_valid_number(""));
        assert!(!is_valid_number("555000111"));          // nine digits
        assert!(!is_valid_number("555-000-1111"));
        assert!(!is_valid_number("+1555000111a"));
        assert!(!is_valid_number("++15550001111"));
        assert!(!is_valid_number("5550001111+"));
        assert!(!is_valid_number("(555) 000-1111"));
    }

    #[tokio::test]
    async fn unauthenticated_action_fails_before_network() {
        let mut c = client();
        // Valid input, no token: must be an authentication failure raised
        // locally (no request is ever built for an unauthenticated action).
        let err = c.send_sms("+15550001111", "hi").await.unwrap_err();
        assert!(err.is_auth(), "got {err:?}");
    }

    #[tokio::test]
    async fn validation_precedes_the_auth_check() {
        let mut c = client();
        let err = c.send_sms("bogus", "hi").await.unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn dial_requires_a_callback_number() {
        let mut c = client();
        c.session.token = Some("tok".into());
        let err = c.call("+15550001111").await.unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn ok_response_passes() {
        let v = check_ok(br#"{"ok": true, "data": {"code": 0}}"#, "").unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn code_20_gets_a_callback_hint() {
        let err = check_ok(br#"{"ok": false, "data": {"code": 20}}"#, "+15550001111").unwrap_err();
        match err {
            BackendError::Remote(e) => {
                assert!(e.is_code(20));
                assert!(e.hint.unwrap().contains("+15550001111"));
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn other_codes_surface_raw_response() {
        let err = check_ok(br#"{"ok": false, "data": {"code": 7}}"#, "").unwrap_err();
        match err {
            BackendError::Remote(e) => {
                assert!(e.is_code(7));
                assert!(e.hint.is_none());
                assert!(e.raw.contains("\"code\": 7"));
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn non_json_response_is_a_remote_error() {
        let err = check_ok(b"<html>maintenance</html>", "").unwrap_err();
        assert!(matches!(err, BackendError::Remote(_)));
    }

    #[test]
    fn python_cased_booleans_still_decode() {
        // Some interface revisions emitted Python-cased literals here.
        let v = check_ok(br#"{"ok": True}"#, "").unwrap();
        assert_eq!(v["ok"], true);
    }
}
