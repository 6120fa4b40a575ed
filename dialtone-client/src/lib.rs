//! # dialtone-client
//!
//! Async client for the classic Google Voice web interface — the service
//! never had a public API, so this client does what a browser would:
//!
//! - Browser-style login with persistent cookie jar and anti-forgery token
//! - Staleness-based re-auth, with the token re-extracted on every pass
//! - Feed scraping: voicemail, SMS, recent/placed/received/missed, search
//! - Dual-payload reconciliation — every feed response encodes the same
//!   conversations twice (JSON status blob + HTML fragment) and both halves
//!   must agree
//! - Token-stamped actions: dial, cancel, SMS, mark read, archive, DND,
//!   callback number
//! - Recording download to a local path
//!
//! The whole service surface (endpoints, form fields, scrape patterns) is
//! data in [`ServiceConfig`], so an interface revision is a config swap.
//!
//! The client is deliberately single-threaded: methods take `&mut self`, and
//! one [`Client`] owns one cookie jar file. Run it from a worker task and
//! keep exactly one per session.

#![deny(unsafe_code)]

mod actions;
mod auth;
mod config;
mod errors;
mod feeds;
mod retry;
mod session;
mod transport;
mod types;

pub mod envelope;
pub mod merge;
pub mod parser;

pub use actions::is_valid_number;
pub use config::{Endpoints, LoginForm, PatternConfig, ServiceConfig};
pub use errors::{BackendError, NetworkError, RemoteError};
pub use feeds::Feed;
pub use retry::{BoundedRetry, NoRetries, RetryContext, RetryPolicy};
pub use types::{
    Accuracy, Conversation, ConversationKind, Message, MessageText, NO_TRANSCRIPTION,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::parser::Patterns;
use crate::session::SessionState;
use crate::transport::SessionTransport;

// ─── Client ───────────────────────────────────────────────────────────────────

/// The one public surface. Composes the session transport, auth state,
/// compiled patterns and service configuration.
pub struct Client {
    pub(crate) config: ServiceConfig,
    pub(crate) transport: SessionTransport,
    pub(crate) session: SessionState,
    pub(crate) patterns: Patterns,
}

impl Client {
    /// Open a client over the cookie jar at `cookie_path` with the given
    /// service configuration. Compiles the whole pattern battery once; no
    /// network traffic happens here.
    pub fn open(
        config: ServiceConfig,
        cookie_path: impl Into<PathBuf>,
    ) -> Result<Self, BackendError> {
        let patterns = Patterns::compile(&config.patterns)?;
        let retry = Box::new(BoundedRetry {
            limit: config.retry_limit,
            delay: config.retry_delay,
        });
        let transport = SessionTransport::open(
            cookie_path,
            &config.user_agent,
            config.socket_timeout,
            retry,
        )?;
        Ok(Self {
            config,
            transport,
            session: SessionState::default(),
            patterns,
        })
    }

    /// Open with [`ServiceConfig::default`].
    pub fn open_default(cookie_path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        Self::open(ServiceConfig::default(), cookie_path)
    }

    // ── Feeds ──────────────────────────────────────────────────────────────

    /// Fetch one feed and reconstruct its conversations.
    pub async fn get_feed(&mut self, feed: Feed) -> Result<Vec<Conversation>, BackendError> {
        self.ensure_authed(false).await?;
        let body = self
            .transport
            .fetch(feed.url(&self.config.endpoints), None, None)
            .await?;
        let (json, html) = envelope::split(&body)?;
        let records = self.patterns.parse(&html, feed.kind());
        merge::merge(records, &json, feed.kind())
    }

    pub async fn get_voicemails(&mut self) -> Result<Vec<Conversation>, BackendError> {
        self.get_feed(Feed::Voicemail).await
    }

    pub async fn get_texts(&mut self) -> Result<Vec<Conversation>, BackendError> {
        self.get_feed(Feed::Sms).await
    }

    /// Everything the service lists as recent activity.
    pub async fn get_recent(&mut self) -> Result<Vec<Conversation>, BackendError> {
        self.get_feed(Feed::All).await
    }

    /// Full-text search across conversations.
    pub async fn search(&mut self, query: &str) -> Result<Vec<Conversation>, BackendError> {
        self.ensure_authed(false).await?;
        let url = reqwest::Url::parse_with_params(&self.config.endpoints.search, &[("q", query)])
            .map_err(|e| BackendError::Validation(format!("bad search query: {e}")))?;
        let body = self.transport.fetch(url.as_str(), None, None).await?;
        let (json, html) = envelope::split(&body)?;
        let kind = ConversationKind::Voicemail;
        let records = self.patterns.parse(&html, kind);
        merge::merge(records, &json, kind)
    }

    /// Per-label unread counts from the inbox envelope's JSON half.
    pub async fn get_unread_counts(&mut self) -> Result<HashMap<String, u64>, BackendError> {
        self.ensure_authed(false).await?;
        let body = self
            .transport
            .fetch(Feed::Inbox.url(&self.config.endpoints), None, None)
            .await?;
        let (json, _html) = envelope::split(&body)?;
        let mut counts = HashMap::new();
        if let Some(map) = json.get("unreadCounts").and_then(Value::as_object) {
            for (label, count) in map {
                counts.insert(label.clone(), count.as_u64().unwrap_or(0));
            }
        }
        Ok(counts)
    }

    /// Download a voicemail/recording by message id, writing the bytes to
    /// `out` verbatim.
    pub async fn download_recording(
        &mut self,
        message_id: &str,
        out: &Path,
    ) -> Result<(), BackendError> {
        if message_id.is_empty() {
            return Err(BackendError::Validation("empty message id".into()));
        }
        self.ensure_authed(false).await?;
        let url = format!("{}{}", self.config.endpoints.download, message_id);
        let body = self.transport.fetch(&url, None, None).await?;
        std::fs::write(out, &body)?;
        Ok(())
    }

    // ── Session accessors ──────────────────────────────────────────────────

    pub fn account_number(&self) -> Option<&str> {
        self.session.account_number.as_deref()
    }

    /// The number the service rings back when connecting a call.
    pub fn callback_number(&self) -> &str {
        &self.session.callback_number
    }

    /// number → human label, as scraped from the account page.
    pub fn callback_numbers(&self) -> &HashMap<String, String> {
        &self.session.callback_numbers
    }
}
