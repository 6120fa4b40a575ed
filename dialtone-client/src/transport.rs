//! Cookie-jar-backed HTTP transport with bounded retry.
//!
//! One [`SessionTransport`] owns one cookie jar file — the jar is the only
//! durable state of a session, and two sessions must never share one file.
//! Cookies from `Set-Cookie` merge into the jar on every response; nothing
//! is written to disk until [`SessionTransport::save_cookies`] is called.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cookie_store::CookieStore;
use reqwest::header::REFERER;
use reqwest_cookie_store::CookieStoreMutex;

use crate::errors::{BackendError, NetworkError};
use crate::retry::{RetryContext, RetryPolicy};

pub struct SessionTransport {
    http: reqwest::Client,
    jar: Arc<CookieStoreMutex>,
    cookie_path: PathBuf,
    retry: Box<dyn RetryPolicy>,
    /// Whether the jar file existed (and parsed) at open time.
    loaded_from_disk: bool,
}

impl SessionTransport {
    /// Open a transport over the cookie jar at `cookie_path`, loading it if
    /// the file exists. A jar that fails to parse is discarded with a
    /// warning and replaced with an empty one.
    pub fn open(
        cookie_path: impl Into<PathBuf>,
        user_agent: &str,
        timeout: Duration,
        retry: Box<dyn RetryPolicy>,
    ) -> Result<Self, BackendError> {
        let cookie_path = cookie_path.into();
        let mut loaded_from_disk = false;

        let store = if cookie_path.exists() {
            let reader = BufReader::new(File::open(&cookie_path)?);
            match CookieStore::load_json(reader) {
                Ok(store) => {
                    loaded_from_disk = true;
                    store
                }
                Err(e) => {
                    tracing::warn!("discarding unreadable cookie jar {:?}: {e}", cookie_path);
                    CookieStore::default()
                }
            }
        } else {
            CookieStore::default()
        };

        let jar = Arc::new(CookieStoreMutex::new(store));
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self { http, jar, cookie_path, retry, loaded_from_disk })
    }

    /// Fetch `url`: GET when `form` is `None`, url-encoded POST otherwise.
    ///
    /// The full request is re-attempted per the retry policy on transport
    /// failures. A declared-vs-read length mismatch is an integrity failure
    /// and is surfaced immediately, never retried.
    pub async fn fetch(
        &self,
        url: &str,
        form: Option<&[(&str, String)]>,
        referer: Option<&str>,
    ) -> Result<Vec<u8>, BackendError> {
        let mut fail_count = 0u32;
        loop {
            match self.attempt(url, form, referer).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Truncated { expected, got }) => {
                    return Err(NetworkError::Truncated { expected, got }.into());
                }
                Err(AttemptError::Http(e)) => {
                    fail_count += 1;
                    let ctx = RetryContext { fail_count, error: &e };
                    match self.retry.should_retry(&ctx) {
                        ControlFlow::Continue(delay) => tokio::time::sleep(delay).await,
                        ControlFlow::Break(()) => return Err(NetworkError::Http(e).into()),
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        form: Option<&[(&str, String)]>,
        referer: Option<&str>,
    ) -> Result<Vec<u8>, AttemptError> {
        let mut req = match form {
            Some(fields) => self.http.post(url).form(fields),
            None => self.http.get(url),
        };
        if let Some(r) = referer {
            req = req.header(REFERER, r);
        }

        let resp = req.send().await?.error_for_status()?;
        let declared = resp.content_length();
        let body = resp.bytes().await?;

        if let Some(expected) = declared {
            if expected != body.len() as u64 {
                return Err(AttemptError::Truncated { expected, got: body.len() as u64 });
            }
        }
        tracing::debug!("fetched {url}: {} bytes", body.len());
        Ok(body.to_vec())
    }

    /// Flush the jar to its file. Callers decide when a jar is worth
    /// persisting (after auth-relevant exchanges); there is no auto-save.
    pub fn save_cookies(&self) -> Result<(), BackendError> {
        if let Some(parent) = self.cookie_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(&self.cookie_path)?);
        let store = self.jar.lock().unwrap();
        store
            .save_json(&mut writer)
            .map_err(|e| BackendError::Network(NetworkError::Io(std::io::Error::other(e.to_string()))))
    }

    /// Wipe the in-memory jar and delete its file (logout semantics).
    pub fn clear_cookies(&mut self) -> Result<(), BackendError> {
        self.jar.lock().unwrap().clear();
        self.loaded_from_disk = false;
        if self.cookie_path.exists() {
            std::fs::remove_file(&self.cookie_path)?;
        }
        Ok(())
    }

    /// True when the jar holds any cookie — either loaded from disk at open
    /// time or accumulated since.
    pub fn has_cookies(&self) -> bool {
        self.loaded_from_disk || self.jar.lock().unwrap().iter_any().next().is_some()
    }
}

enum AttemptError {
    Http(reqwest::Error),
    Truncated { expected: u64, got: u64 },
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}
