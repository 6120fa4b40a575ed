//! Login, token acquisition and staleness-based re-auth.
//!
//! The service's login flow is a plain browser flow: scrape an optional
//! anti-automation token off the pre-login page, POST credentials, then pull
//! the real session token out of whatever page comes back. The account page
//! doubles as the re-auth probe — if it still carries the token, the cookies
//! are good.

use crate::errors::BackendError;
use crate::parser::{self, Patterns};
use crate::Client;

impl Client {
    /// Cheap check, no network: a prior cookie load or a recent successful
    /// auth suggests a full credential login can be skipped.
    pub fn is_authed_quick(&self) -> bool {
        self.transport.has_cookies() || self.session.is_fresh(self.config.stale_after)
    }

    /// Make sure the session is usable, revalidating against the account
    /// page when stale or when `force` is set.
    ///
    /// A page that comes back without the session token means the cookies no
    /// longer authenticate — that is an authentication failure, distinct
    /// from not being able to reach the service at all.
    pub async fn ensure_authed(&mut self, force: bool) -> Result<(), BackendError> {
        if !force && self.session.has_token() && self.session.is_fresh(self.config.stale_after) {
            return Ok(());
        }

        let body = self
            .transport
            .fetch(&self.config.endpoints.account, None, None)
            .await?;
        let page = String::from_utf8_lossy(&body);

        let token = extract_session_token(&self.patterns, &page).ok_or_else(|| {
            BackendError::Authentication("account page carried no session token".into())
        })?;
        self.session.token = Some(token);

        self.session.account_number = parser::capture(&self.patterns.account_number, &page);
        self.session.callback_numbers.clear();
        for caps in self.patterns.callback_entry.captures_iter(&page) {
            if let (Some(number), Some(label)) = (caps.get(1), caps.get(2)) {
                self.session
                    .callback_numbers
                    .insert(number.as_str().trim().to_string(), label.as_str().trim().to_string());
            }
        }

        self.session.mark_authed();
        self.transport.save_cookies()?;
        tracing::info!(
            account = self.session.account_number.as_deref().unwrap_or("?"),
            "session validated"
        );
        Ok(())
    }

    /// Full credential login. Clears any existing session first.
    ///
    /// The service sometimes answers the credential POST with a redirect
    /// stub instead of the final page; when token extraction fails on the
    /// immediate response, revalidate once via the account page before
    /// declaring the login failed.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), BackendError> {
        self.logout()?;

        // Best effort: a missing anti-automation token is posted as "".
        let pre_body = self
            .transport
            .fetch(&self.config.endpoints.pre_login_token, None, None)
            .await?;
        let pre_page = String::from_utf8_lossy(&pre_body);
        let pre_token =
            parser::capture(&self.patterns.pre_login_token, &pre_page).unwrap_or_default();
        if pre_token.is_empty() {
            tracing::debug!("pre-login token not present; posting empty field");
        }

        let lf = &self.config.login;
        let mut form: Vec<(&str, String)> = vec![
            (lf.email_field.as_str(), username.to_string()),
            (lf.password_field.as_str(), password.to_string()),
            (lf.pre_login_token_field.as_str(), pre_token),
        ];
        for (name, value) in &lf.extra_fields {
            form.push((name.as_str(), value.clone()));
        }

        let body = self
            .transport
            .fetch(
                &self.config.endpoints.login,
                Some(&form),
                Some(&self.config.endpoints.pre_login_token),
            )
            .await?;
        let page = String::from_utf8_lossy(&body);

        if let Some(token) = extract_session_token(&self.patterns, &page) {
            self.session.token = Some(token);
            self.session.mark_authed();
            self.transport.save_cookies()?;
            tracing::info!("logged in");
            return Ok(());
        }

        tracing::info!("no token on post-login page; revalidating once via account page");
        match self.ensure_authed(true).await {
            Ok(()) => Ok(()),
            Err(BackendError::Authentication(_)) => Err(BackendError::Authentication(
                "login rejected: no session token after credential POST".into(),
            )),
            Err(other) => Err(other),
        }
    }

    /// Drop the local session: cookies, token, freshness. The server is not
    /// contacted; its side of the session simply expires.
    pub fn logout(&mut self) -> Result<(), BackendError> {
        self.session.reset();
        self.transport.clear_cookies()
    }
}

/// Pull the session token off a page; an empty `value=""` does not count.
fn extract_session_token(patterns: &Patterns, page: &str) -> Option<String> {
    parser::capture(&patterns.session_token, page).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;

    fn patterns() -> Patterns {
        Patterns::compile(&PatternConfig::default()).unwrap()
    }

    #[test]
    fn token_extracted_from_account_page() {
        let page = r#"<form><input type="hidden" name="_rnr_se" value="AbC/123=" /></form>"#;
        assert_eq!(extract_session_token(&patterns(), page), Some("AbC/123=".to_string()));
    }

    #[test]
    fn empty_token_value_is_absent() {
        let page = r#"<input name="_rnr_se" value="" />"#;
        assert_eq!(extract_session_token(&patterns(), page), None);
    }

    #[test]
    fn redirect_stub_has_no_token() {
        let page = r#"<html><head><meta http-equiv="refresh" content="0;url=/voice"></head></html>"#;
        assert_eq!(extract_session_token(&patterns(), page), None);
    }

    #[test]
    fn callback_entries_scrape_number_and_label() {
        let p = patterns();
        let page = "  +15550001111: Mobile<br/>\n  (555) 000-2222: Office <br />\n";
        let entries: Vec<(String, String)> = p
            .callback_entry
            .captures_iter(page)
            .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("+15550001111".to_string(), "Mobile".to_string()),
                ("(555) 000-2222".to_string(), "Office".to_string()),
            ]
        );
    }
}
