//! In-memory session state — token, account metadata, auth freshness.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Mutable per-session state. Owned exclusively by the client; torn down on
/// logout.
#[derive(Default)]
pub struct SessionState {
    /// Anti-forgery token stamped onto every mutating POST. Re-extracted on
    /// every successful auth; `None` while logged out.
    pub token: Option<String>,
    pub account_number: Option<String>,
    /// Number the service rings back when connecting a call. Must be
    /// non-empty before `call`/`cancel_call`.
    pub callback_number: String,
    /// number → human label, scraped from the account page.
    pub callback_numbers: HashMap<String, String>,
    /// When the last successful auth happened; drives staleness.
    pub last_authed: Option<Instant>,
}

impl SessionState {
    /// True while the last successful auth is younger than `window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        match self.last_authed {
            Some(t) => t.elapsed() < window,
            None => false,
        }
    }

    /// True once any successful auth has happened and not been torn down.
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn mark_authed(&mut self) {
        self.last_authed = Some(Instant::now());
    }

    /// Logout semantics: drop the token and freshness, keep nothing that
    /// would let a mutating call through.
    pub fn reset(&mut self) {
        self.token = None;
        self.account_number = None;
        self.callback_numbers.clear();
        self.last_authed = None;
        // callback_number is caller-chosen configuration, not service
        // state; it survives logout so a re-login can dial immediately.
    }
}
