//! Fusing parsed HTML records with the envelope's JSON status flags.
//!
//! The two halves of a feed envelope describe the same message set twice.
//! A record whose id is missing from the JSON half means the halves were
//! rendered against different states (pagination, or a concurrent change on
//! the server) — that is unsafe to paper over, so it is a hard error.

use serde_json::Value;

use crate::errors::BackendError;
use crate::parser::RawRecord;
use crate::types::{Conversation, ConversationKind};

/// Label the service keeps on conversations still in the inbox; its absence
/// is what "archived" means.
const INBOX_LABEL: &str = "inbox";

/// Build final [`Conversation`]s from parsed records and the status JSON.
pub fn merge(
    records: Vec<RawRecord>,
    json: &Value,
    kind: ConversationKind,
) -> Result<Vec<Conversation>, BackendError> {
    let entries = json.get("messages").and_then(Value::as_object);

    records
        .into_iter()
        .map(|r| {
            let entry = entries
                .and_then(|m| m.get(&r.id))
                .ok_or_else(|| BackendError::OutOfSync { id: r.id.clone() })?;

            let labels = entry.get("labels").and_then(Value::as_array);
            let in_inbox = labels
                .map(|ls| ls.iter().any(|l| l.as_str() == Some(INBOX_LABEL)))
                .unwrap_or(false);

            Ok(Conversation {
                id: r.id,
                kind,
                contact_id: r.contact_id,
                name: r.name,
                pretty_number: r.pretty_number,
                number: r.number,
                location: r.location,
                time: r.time,
                rel_time: r.rel_time,
                messages: r.messages,
                is_read: flag(entry, "isRead"),
                is_spam: flag(entry, "isSpam"),
                is_trash: flag(entry, "isTrash"),
                is_archived: !in_inbox,
            })
        })
        .collect()
}

fn flag(entry: &Value, key: &str) -> bool {
    entry.get(key).and_then(Value::as_bool).unwrap_or(false)
}
