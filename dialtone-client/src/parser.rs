//! Regex-driven conversation parsing.
//!
//! The service's HTML fragment is an ad hoc grammar, so each field lives
//! behind its own named pattern returning an optional match — absence of a
//! field is normal, not an error. All patterns are compiled exactly once
//! into a [`Patterns`] value at client construction and are read-only
//! afterwards.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;

use crate::config::PatternConfig;
use crate::errors::BackendError;
use crate::types::{Accuracy, ConversationKind, Message, MessageText};

// ─── Patterns ─────────────────────────────────────────────────────────────────

/// The full compiled pattern battery.
pub struct Patterns {
    block: Regex,
    exact_time: Regex,
    rel_time: Regex,
    name: Regex,
    number: Regex,
    pretty_number: Regex,
    location: Regex,
    contact_id: Regex,
    vm_fragment: Regex,
    sms_from: Regex,
    sms_text: Regex,
    sms_time: Regex,

    pub(crate) session_token: Regex,
    pub(crate) pre_login_token: Regex,
    pub(crate) account_number: Regex,
    pub(crate) callback_entry: Regex,
}

impl Patterns {
    pub fn compile(cfg: &PatternConfig) -> Result<Self, BackendError> {
        fn rx(src: &str, what: &str) -> Result<Regex, BackendError> {
            Regex::new(src)
                .map_err(|e| BackendError::Validation(format!("bad {what} pattern: {e}")))
        }
        Ok(Self {
            block: rx(&cfg.block, "block")?,
            exact_time: rx(&cfg.exact_time, "exact_time")?,
            rel_time: rx(&cfg.rel_time, "rel_time")?,
            name: rx(&cfg.name, "name")?,
            number: rx(&cfg.number, "number")?,
            pretty_number: rx(&cfg.pretty_number, "pretty_number")?,
            location: rx(&cfg.location, "location")?,
            contact_id: rx(&cfg.contact_id, "contact_id")?,
            vm_fragment: rx(&cfg.vm_fragment, "vm_fragment")?,
            sms_from: rx(&cfg.sms_from, "sms_from")?,
            sms_text: rx(&cfg.sms_text, "sms_text")?,
            sms_time: rx(&cfg.sms_time, "sms_time")?,
            session_token: rx(&cfg.session_token, "session_token")?,
            pre_login_token: rx(&cfg.pre_login_token, "pre_login_token")?,
            account_number: rx(&cfg.account_number, "account_number")?,
            callback_entry: rx(&cfg.callback_entry, "callback_entry")?,
        })
    }
}

// ─── RawRecord ────────────────────────────────────────────────────────────────

/// One parsed message block, before the JSON status flags are merged in.
#[derive(Clone, Debug)]
pub struct RawRecord {
    pub id: String,
    pub time: DateTime<Utc>,
    pub rel_time: String,
    pub name: String,
    pub number: String,
    pub pretty_number: String,
    pub location: String,
    pub contact_id: String,
    /// Never empty — the "No Transcription" sentinel is substituted when a
    /// voicemail body yields no fragments.
    pub messages: Vec<Message>,
}

// ─── Parsing ──────────────────────────────────────────────────────────────────

impl Patterns {
    /// Segment `html` into message blocks and extract every field.
    ///
    /// Segmentation splits on the block-boundary pattern (capturing the id)
    /// and regroups the pieces two at a time; a dangling marker with no
    /// trailing body gets an empty body instead of a panic.
    pub fn parse(&self, html: &str, kind: ConversationKind) -> Vec<RawRecord> {
        let mut pieces: Vec<&str> = Vec::new();
        let mut prev_end: Option<usize> = None;

        for caps in self.block.captures_iter(html) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            if let Some(end) = prev_end {
                pieces.push(&html[end..whole.start()]);
            }
            if let Some(id) = caps.get(1) {
                pieces.push(id.as_str());
                prev_end = Some(whole.end());
            }
        }
        if let Some(end) = prev_end {
            if end < html.len() {
                pieces.push(&html[end..]);
            }
        }

        grouped(pieces, 2)
            .into_iter()
            .filter_map(|pair| {
                let mut pair = pair.into_iter();
                let id = pair.next().flatten()?;
                let body = pair.next().flatten().unwrap_or("");
                Some(self.parse_record(id, body, kind))
            })
            .collect()
    }

    fn parse_record(&self, id: &str, body: &str, kind: ConversationKind) -> RawRecord {
        let rel_time = first_capture(&self.rel_time, body);
        let name = first_capture(&self.name, body);

        let messages = match kind {
            ConversationKind::Voicemail => self.voicemail_messages(body, &name, &rel_time),
            ConversationKind::Sms => self.sms_messages(body),
        };

        RawRecord {
            id: id.to_string(),
            time: parse_exact_time(&first_capture(&self.exact_time, body)),
            rel_time,
            name,
            number: first_capture(&self.number, body),
            pretty_number: first_capture(&self.pretty_number, body),
            location: first_capture(&self.location, body),
            contact_id: first_capture(&self.contact_id, body),
            messages,
        }
    }

    /// Transcript fragments: quality-tagged word spans, or embedded
    /// phone-number tokens which are literal and therefore `High`.
    fn voicemail_messages(&self, body: &str, name: &str, rel_time: &str) -> Vec<Message> {
        let mut texts = Vec::new();
        for caps in self.vm_fragment.captures_iter(body) {
            if let (Some(quality), Some(text)) = (caps.get(1), caps.get(2)) {
                texts.push(MessageText {
                    accuracy: accuracy_from_marker(quality.as_str()),
                    text: text.as_str().trim().to_string(),
                });
            } else if let Some(number) = caps.get(3) {
                texts.push(MessageText {
                    accuracy: Accuracy::High,
                    text: number.as_str().trim().to_string(),
                });
            }
        }
        if texts.is_empty() {
            texts.push(MessageText::no_transcription());
        }
        vec![Message { who_from: name.to_string(), when: rel_time.to_string(), texts }]
    }

    /// SMS bodies carry three parallel streams (from, text, time) that the
    /// markup aligns positionally. The source format gives no way to verify
    /// the alignment; a length mismatch is logged and zipped to the
    /// shortest stream rather than trusted.
    fn sms_messages(&self, body: &str) -> Vec<Message> {
        let froms: Vec<String> = all_captures(&self.sms_from, body);
        let texts: Vec<String> = all_captures(&self.sms_text, body);
        let times: Vec<String> = all_captures(&self.sms_time, body);

        if froms.len() != texts.len() || texts.len() != times.len() {
            tracing::warn!(
                "sms streams misaligned (from={}, text={}, time={}); zipping to shortest",
                froms.len(),
                texts.len(),
                times.len()
            );
        }

        froms
            .into_iter()
            .zip(texts)
            .zip(times)
            .map(|((who_from, text), when)| Message {
                who_from,
                when,
                texts: vec![MessageText { accuracy: Accuracy::High, text }],
            })
            .collect()
    }
}

/// First capture group of the first match, trimmed; `None` when the pattern
/// doesn't match at all.
pub(crate) fn capture(rx: &Regex, text: &str) -> Option<String> {
    rx.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn first_capture(rx: &Regex, body: &str) -> String {
    capture(rx, body).unwrap_or_default()
}

fn all_captures(rx: &Regex, body: &str) -> Vec<String> {
    rx.captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

fn accuracy_from_marker(marker: &str) -> Accuracy {
    if marker.eq_ignore_ascii_case("high") {
        Accuracy::High
    } else if marker.to_ascii_lowercase().starts_with("med") {
        Accuracy::Medium
    } else {
        Accuracy::Low
    }
}

// ─── Time ─────────────────────────────────────────────────────────────────────

/// The service emits one locale-fixed time format regardless of the caller's
/// locale: `M/D/YY H:MM` with a trailing `AM`/`PM` marker. Strip the marker,
/// parse the numeric remainder, add 12 hours for `PM`.
///
/// An unparsable string must not abort a whole fetch: it falls back to the
/// year-1 sentinel, with a warning.
pub(crate) fn parse_exact_time(text: &str) -> DateTime<Utc> {
    match try_parse_exact_time(text) {
        Some(dt) => Utc.from_utc_datetime(&dt),
        None => {
            tracing::warn!("unparsable exact time {text:?}; substituting sentinel");
            sentinel_time()
        }
    }
}

fn try_parse_exact_time(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    let (clock, pm) = if let Some(rest) = trimmed.strip_suffix("PM") {
        (rest.trim_end(), true)
    } else if let Some(rest) = trimmed.strip_suffix("AM") {
        (rest.trim_end(), false)
    } else {
        (trimmed, false)
    };
    let dt = NaiveDateTime::parse_from_str(clock, "%m/%d/%y %H:%M").ok()?;
    if pm { dt.checked_add_signed(TimeDelta::hours(12)) } else { Some(dt) }
}

/// Recognizable "the service's time string made no sense" timestamp.
pub(crate) fn sentinel_time() -> DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ─── Grouping ─────────────────────────────────────────────────────────────────

/// Regroup `items` into runs of `n`, padding the final run with `None`
/// rather than dropping trailing elements.
pub(crate) fn grouped<T>(items: Vec<T>, n: usize) -> Vec<Vec<Option<T>>> {
    let mut out = Vec::with_capacity(items.len() / n.max(1) + 1);
    let mut run: Vec<Option<T>> = Vec::with_capacity(n);
    for item in items {
        run.push(Some(item));
        if run.len() == n {
            out.push(std::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        while run.len() < n {
            run.push(None);
        }
        out.push(run);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_TRANSCRIPTION;

    fn patterns() -> Patterns {
        Patterns::compile(&PatternConfig::default()).unwrap()
    }

    const VOICEMAIL_BLOCK: &str = r##"
 <div id="a1f" class="gc-message gc-message-unread">
  <span class="gc-message-time">3/25/11 4:46 PM</span>
  <span class="gc-message-relative">2 hours ago</span>
  <a class="gc-under gc-message-name-link" href="/voice/b?contactId=c77">Alice Example</a>
  <input type="hidden" class="gc-text gc-quickcall-ac" value="+15550001111" />
  <span class="gc-message-type">(555) 000-1111</span>
  <span class="gc-message-location">Springfield, IL</span>
  <span id="0-0" class="gc-word-high">hello</span>
  <span id="0-1" class="gc-word-med1">this</span>
  <span id="0-2" class="gc-word-low">is</span>
  <a href="#" class="gc-message-mni">555 867 5309</a>
 </div>
"##;

    #[test]
    fn grouped_pads_final_run() {
        let runs = grouped(vec![1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(
            runs,
            vec![
                vec![Some(1), Some(2), Some(3)],
                vec![Some(4), Some(5), Some(6)],
                vec![Some(7), None, None],
            ]
        );
    }

    #[test]
    fn grouped_exact_multiple_has_no_padding() {
        let runs = grouped(vec!["a", "b"], 2);
        assert_eq!(runs, vec![vec![Some("a"), Some("b")]]);
    }

    #[test]
    fn voicemail_block_fields() {
        let records = patterns().parse(VOICEMAIL_BLOCK, ConversationKind::Voicemail);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, "a1f");
        assert_eq!(r.name, "Alice Example");
        assert_eq!(r.number, "+15550001111");
        assert_eq!(r.pretty_number, "(555) 000-1111");
        assert_eq!(r.location, "Springfield, IL");
        assert_eq!(r.contact_id, "c77");
        assert_eq!(r.rel_time, "2 hours ago");
        assert_eq!(r.time, Utc.with_ymd_and_hms(2011, 3, 25, 16, 46, 0).unwrap());
    }

    #[test]
    fn voicemail_transcript_fragments_and_accuracies() {
        let records = patterns().parse(VOICEMAIL_BLOCK, ConversationKind::Voicemail);
        let texts = &records[0].messages[0].texts;
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], MessageText { accuracy: Accuracy::High, text: "hello".into() });
        assert_eq!(texts[1].accuracy, Accuracy::Medium);
        assert_eq!(texts[2].accuracy, Accuracy::Low);
        // Embedded phone-number token is literal, therefore High.
        assert_eq!(texts[3], MessageText { accuracy: Accuracy::High, text: "555 867 5309".into() });
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let html = "\n <div id=\"bare\" class=\"gc-message\">\n nothing here \n </div>\n";
        let records = patterns().parse(html, ConversationKind::Voicemail);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name, "");
        assert_eq!(r.number, "");
        assert_eq!(r.location, "");
        assert_eq!(r.time, sentinel_time());
    }

    #[test]
    fn no_fragments_substitutes_no_transcription() {
        let html = "\n <div id=\"empty1\" class=\"gc-message\">\n <span class=\"gc-message-relative\">1 day ago</span>\n </div>\n";
        let records = patterns().parse(html, ConversationKind::Voicemail);
        assert_eq!(records[0].messages.len(), 1);
        let texts = &records[0].messages[0].texts;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, NO_TRANSCRIPTION);
        assert_eq!(texts[0].accuracy, Accuracy::Low);
    }

    #[test]
    fn sms_streams_zip_positionally() {
        let html = r#"
 <div id="s1" class="gc-message">
  <span class="gc-message-sms-from">Me:</span>
  <span class="gc-message-sms-text">on my way</span>
  <span class="gc-message-sms-time">5:01 PM</span>
  <span class="gc-message-sms-from">Bob:</span>
  <span class="gc-message-sms-text">ok see you</span>
  <span class="gc-message-sms-time">5:03 PM</span>
 </div>
"#;
        let records = patterns().parse(html, ConversationKind::Sms);
        let msgs = &records[0].messages;
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].who_from, "Me:");
        assert_eq!(msgs[0].texts[0].text, "on my way");
        assert_eq!(msgs[1].when, "5:03 PM");
    }

    #[test]
    fn pm_is_twelve_hours_after_am() {
        let am = parse_exact_time("3/25/11 4:46 AM");
        let pm = parse_exact_time("3/25/11 4:46 PM");
        assert_eq!(pm - am, TimeDelta::hours(12));
    }

    #[test]
    fn unparsable_time_falls_back_to_sentinel() {
        use chrono::Datelike;
        let t = parse_exact_time("whenever");
        assert_eq!(t.year(), 1);
    }

    #[test]
    fn multiple_blocks_segment_independently() {
        let html = format!(
            "{VOICEMAIL_BLOCK}\n <div id=\"b2e\" class=\"gc-message\">\n <span class=\"gc-message-relative\">3 days ago</span>\n </div>\n"
        );
        let records = patterns().parse(&html, ConversationKind::Voicemail);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a1f");
        assert_eq!(records[1].id, "b2e");
        assert_eq!(records[1].rel_time, "3 days ago");
    }
}
