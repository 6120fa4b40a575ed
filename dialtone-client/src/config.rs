//! Service configuration — every endpoint URL, form field name, scrape
//! pattern and tunable lives here as plain data.
//!
//! The service's web interface drifted repeatedly over its lifetime
//! (different endpoint sets, slightly different markup). Representing the
//! whole surface as one [`ServiceConfig`] keeps those differences in data
//! instead of forked client code: retargeting the client to another
//! interface revision means swapping a config, not patching parsers.

use std::time::Duration;

// ─── Endpoints ────────────────────────────────────────────────────────────────

/// Absolute URLs of every page and API endpoint the client touches.
///
/// Feed URLs are one field per feed — [`crate::Feed::url`] maps the closed
/// feed enum onto these, so an invalid feed name cannot exist at runtime.
#[derive(Clone, Debug)]
pub struct Endpoints {
    /// Pre-login page carrying the anti-automation token (GET, best effort).
    pub pre_login_token: String,
    /// Credential POST target.
    pub login: String,
    /// Account/settings page: confirms auth, carries the session token,
    /// the account number and the callback-number list.
    pub account: String,

    pub feed_inbox: String,
    pub feed_starred: String,
    pub feed_all: String,
    pub feed_spam: String,
    pub feed_trash: String,
    pub feed_voicemail: String,
    pub feed_sms: String,
    pub feed_recorded: String,
    pub feed_placed: String,
    pub feed_received: String,
    pub feed_missed: String,

    /// Search feed; the query is passed as the `q` query parameter.
    pub search: String,
    /// Recording download; the message id is appended.
    pub download: String,

    pub call_connect: String,
    pub call_cancel: String,
    pub sms_send: String,
    pub mark: String,
    pub archive: String,
    pub dnd: String,
    pub forwarding: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        let voice = "https://www.google.com/voice";
        Self {
            pre_login_token: "https://accounts.google.com/ServiceLogin?service=grandcentral"
                .to_string(),
            login: "https://accounts.google.com/ServiceLoginAuth".to_string(),
            account: format!("{voice}/settings/tab/phones"),

            feed_inbox: format!("{voice}/inbox/recent/"),
            feed_starred: format!("{voice}/inbox/recent/starred/"),
            feed_all: format!("{voice}/inbox/recent/all/"),
            feed_spam: format!("{voice}/inbox/recent/spam/"),
            feed_trash: format!("{voice}/inbox/recent/trash/"),
            feed_voicemail: format!("{voice}/inbox/recent/voicemail/"),
            feed_sms: format!("{voice}/inbox/recent/sms/"),
            feed_recorded: format!("{voice}/inbox/recent/recorded/"),
            feed_placed: format!("{voice}/inbox/recent/placed/"),
            feed_received: format!("{voice}/inbox/recent/received/"),
            feed_missed: format!("{voice}/inbox/recent/missed/"),

            search: format!("{voice}/inbox/search/"),
            download: format!("{voice}/media/send_voicemail/"),

            call_connect: format!("{voice}/call/connect/"),
            call_cancel: format!("{voice}/call/cancel/"),
            sms_send: format!("{voice}/sms/send/"),
            mark: format!("{voice}/inbox/mark/"),
            archive: format!("{voice}/inbox/archive/"),
            dnd: format!("{voice}/call/donotdisturb/"),
            forwarding: format!("{voice}/settings/editDefaultForwarding/"),
        }
    }
}

// ─── LoginForm ────────────────────────────────────────────────────────────────

/// Field names posted to the login endpoint, plus fixed extra fields.
#[derive(Clone, Debug)]
pub struct LoginForm {
    pub email_field: String,
    pub password_field: String,
    /// Name of the anti-automation token field on the credential POST.
    pub pre_login_token_field: String,
    /// Name of the session-token field stamped onto every mutating POST.
    pub session_token_field: String,
    /// Fixed fields sent verbatim with the credentials: service identifier,
    /// UI template flags, persistent-cookie flag, continue-URL.
    pub extra_fields: Vec<(String, String)>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email_field: "Email".to_string(),
            password_field: "Passwd".to_string(),
            pre_login_token_field: "GALX".to_string(),
            session_token_field: "_rnr_se".to_string(),
            extra_fields: vec![
                ("service".to_string(), "grandcentral".to_string()),
                ("ltmpl".to_string(), "mobile".to_string()),
                ("btmpl".to_string(), "mobile".to_string()),
                ("PersistentCookie".to_string(), "yes".to_string()),
                (
                    "continue".to_string(),
                    "https://www.google.com/voice/account/signin".to_string(),
                ),
            ],
        }
    }
}

// ─── PatternConfig ────────────────────────────────────────────────────────────

/// Source strings for every scrape regex, compiled once into
/// [`crate::parser::Patterns`] at client construction.
///
/// Each pattern is one named extraction capability; swapping the scraping
/// layer for a real HTML parser would replace these without touching the
/// merge or model layers.
#[derive(Clone, Debug)]
pub struct PatternConfig {
    /// Message-block boundary; capture 1 is the block's opaque id.
    pub block: String,
    pub exact_time: String,
    pub rel_time: String,
    pub name: String,
    pub number: String,
    pub pretty_number: String,
    pub location: String,
    pub contact_id: String,
    /// Voicemail transcript fragment: either a quality-tagged word span
    /// (captures 1 = quality, 2 = text) or an embedded phone-number token
    /// (capture 3).
    pub vm_fragment: String,
    pub sms_from: String,
    pub sms_text: String,
    pub sms_time: String,

    /// Session token input on the account page and post-login page.
    pub session_token: String,
    /// Anti-automation token on the pre-login page (best effort).
    pub pre_login_token: String,
    pub account_number: String,
    /// Callback-number list entry; captures (number, label).
    pub callback_entry: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            block: r#"(?m)^\s*<div id="(\w+)"\s+class="[^"]*gc-message[^"]*">"#.to_string(),
            exact_time: r#"<span class="gc-message-time">(.+?)</span>"#.to_string(),
            rel_time: r#"<span class="gc-message-relative">(.+?)</span>"#.to_string(),
            name: r#"<a class="[^"]*gc-message-name-link[^"]*"[^>]*>(.+?)</a>"#.to_string(),
            number: r#"<input type="hidden" class="gc-text gc-quickcall-ac" value="(.+?)"\s*/>"#
                .to_string(),
            pretty_number: r#"<span class="gc-message-type">(.+?)</span>"#.to_string(),
            location: r#"<span class="gc-message-location">(?:<a[^>]*>)?(.+?)(?:</a>)?</span>"#
                .to_string(),
            contact_id: r#"<a class="[^"]*gc-message-name-link[^"]*" href="[^"]*\bcontactId=(\w+)""#
                .to_string(),
            vm_fragment: concat!(
                r#"<span id="\d+-\d+" class="gc-word-(\w+)">(.+?)</span>"#,
                r#"|<a[^>]*class="gc-message-mni"[^>]*>(.+?)</a>"#,
            )
            .to_string(),
            sms_from: r#"<span class="gc-message-sms-from">(.+?)</span>"#.to_string(),
            sms_text: r#"<span class="gc-message-sms-text">(.+?)</span>"#.to_string(),
            sms_time: r#"<span class="gc-message-sms-time">(.+?)</span>"#.to_string(),

            session_token: r#"<input[^>]*name="_rnr_se"[^>]*value="([^"]*)""#.to_string(),
            pre_login_token: r#"<input[^>]*name="GALX"[^>]*value="([^"]*)""#.to_string(),
            account_number: r#"<b class="ms\d">([^<]{8,20})</b>"#.to_string(),
            callback_entry: r#"(?m)^\s*([+(\d][+\d() \-]*\d):\s*([^<\r\n]+?)\s*<br\s*/?>"#
                .to_string(),
        }
    }
}

// ─── ServiceConfig ────────────────────────────────────────────────────────────

/// Complete description of one service-interface revision plus client
/// tunables.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub endpoints: Endpoints,
    pub login: LoginForm,
    pub patterns: PatternConfig,

    /// User-Agent presented on every request. The classic interface served
    /// different (simpler) markup to mobile browsers; the patterns above
    /// match that rendering.
    pub user_agent: String,
    /// Socket timeout applied to every request. Not caller-configurable per
    /// call; the only other bound is the retry policy.
    pub socket_timeout: Duration,
    /// Transport retry bound: 0 = no retry, negative = unbounded.
    pub retry_limit: i32,
    /// Pause between transport retries.
    pub retry_delay: Duration,
    /// How long a successful auth stays fresh before `ensure_authed`
    /// revalidates against the server.
    pub stale_after: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            login: LoginForm::default(),
            patterns: PatternConfig::default(),
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) ",
                "dialtone-client/",
                env!("CARGO_PKG_VERSION"),
            )
            .to_string(),
            socket_timeout: Duration::from_secs(30),
            retry_limit: 2,
            retry_delay: Duration::from_millis(500),
            stale_after: Duration::from_secs(90),
        }
    }
}
