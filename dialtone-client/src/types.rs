//! Conversation model — the entities reconstructed from a feed response.
//!
//! A [`Conversation`] owns its [`Message`]s, a [`Message`] owns its
//! [`MessageText`] fragments. Everything is built fresh on every fetch and
//! handed to the caller by value; nothing here refers back into the client.

use std::fmt;

use chrono::{DateTime, Utc};

// ─── Accuracy ─────────────────────────────────────────────────────────────────

/// Confidence tier of a transcribed voicemail fragment.
///
/// A literal phone-number token embedded in a transcript is always `High` —
/// the service renders recognized numbers as links, not as guessed words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accuracy {
    Low,
    Medium,
    High,
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

// ─── ConversationKind ─────────────────────────────────────────────────────────

/// Which parser family produced a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConversationKind {
    Voicemail,
    Sms,
}

// ─── MessageText ──────────────────────────────────────────────────────────────

/// One fragment of message content.
///
/// Voicemail transcripts arrive as several differently-scored fragments;
/// an SMS body is exactly one `High` fragment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageText {
    pub accuracy: Accuracy,
    pub text: String,
}

/// Sentinel body used when a voicemail has no extractable transcript.
pub const NO_TRANSCRIPTION: &str = "No Transcription";

impl MessageText {
    /// The sentinel fragment substituted when nothing could be extracted.
    pub fn no_transcription() -> Self {
        Self { accuracy: Accuracy::Low, text: NO_TRANSCRIPTION.to_string() }
    }
}

// ─── Message ──────────────────────────────────────────────────────────────────

/// A single message inside a conversation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Display name of the sender, as rendered by the service.
    pub who_from: String,
    /// Display timestamp string, as rendered by the service.
    pub when: String,
    /// Ordered content fragments. Never empty after a successful parse.
    pub texts: Vec<MessageText>,
}

impl Message {
    /// Concatenate all fragments into one plain string.
    pub fn full_text(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─── Conversation ─────────────────────────────────────────────────────────────

/// A voicemail or SMS thread reconstructed from one feed entry.
///
/// `contact_id` is a weak reference into an externally-maintained contacts
/// directory; it is carried verbatim and never resolved here.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conversation {
    /// Opaque identifier scraped from the message block marker.
    pub id: String,
    pub kind: ConversationKind,
    pub contact_id: String,
    /// Display name ("" when the service showed none).
    pub name: String,
    /// Pre-formatted number as rendered by the service.
    pub pretty_number: String,
    /// Canonical phone number.
    pub number: String,
    /// Geographic location label ("" when absent).
    pub location: String,
    /// Absolute timestamp. Year 1 when the service's time string was
    /// unparsable (logged as a warning at parse time).
    pub time: DateTime<Utc>,
    /// Service-supplied relative-time string, e.g. "2 hours ago".
    pub rel_time: String,
    /// Ordered messages. Never empty after a successful parse.
    pub messages: Vec<Message>,
    pub is_read: bool,
    pub is_spam: bool,
    pub is_trash: bool,
    /// Derived: the status labels did not include the inbox label.
    pub is_archived: bool,
}
