//! Feed selection — a closed enum mapped explicitly onto endpoint URLs.

use crate::config::Endpoints;
use crate::types::ConversationKind;

/// Every feed the service exposes. The mapping to URLs is an explicit match
/// so an invalid feed cannot be named at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feed {
    Inbox,
    Starred,
    All,
    Spam,
    Trash,
    Voicemail,
    Sms,
    Recorded,
    Placed,
    Received,
    Missed,
}

impl Feed {
    pub(crate) fn url(self, endpoints: &Endpoints) -> &str {
        match self {
            Self::Inbox => &endpoints.feed_inbox,
            Self::Starred => &endpoints.feed_starred,
            Self::All => &endpoints.feed_all,
            Self::Spam => &endpoints.feed_spam,
            Self::Trash => &endpoints.feed_trash,
            Self::Voicemail => &endpoints.feed_voicemail,
            Self::Sms => &endpoints.feed_sms,
            Self::Recorded => &endpoints.feed_recorded,
            Self::Placed => &endpoints.feed_placed,
            Self::Received => &endpoints.feed_received,
            Self::Missed => &endpoints.feed_missed,
        }
    }

    /// Which parser family reads this feed's blocks. Only the SMS feed uses
    /// the three-stream SMS markup; every other feed renders call-style
    /// blocks (voicemails with transcripts, call records without).
    pub fn kind(self) -> ConversationKind {
        match self {
            Self::Sms => ConversationKind::Sms,
            _ => ConversationKind::Voicemail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_feed_uses_sms_parser() {
        assert_eq!(Feed::Sms.kind(), ConversationKind::Sms);
        assert_eq!(Feed::Voicemail.kind(), ConversationKind::Voicemail);
        assert_eq!(Feed::Missed.kind(), ConversationKind::Voicemail);
    }

    #[test]
    fn every_feed_has_a_distinct_url() {
        let e = Endpoints::default();
        let feeds = [
            Feed::Inbox,
            Feed::Starred,
            Feed::All,
            Feed::Spam,
            Feed::Trash,
            Feed::Voicemail,
            Feed::Sms,
            Feed::Recorded,
            Feed::Placed,
            Feed::Received,
            Feed::Missed,
        ];
        let urls: std::collections::HashSet<&str> = feeds.iter().map(|f| f.url(&e)).collect();
        assert_eq!(urls.len(), feeds.len());
    }
}
