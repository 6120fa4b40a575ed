//! End-to-end feed decoding: envelope split → block parse → status merge.

use chrono::{Datelike, TimeZone, Utc};
use dialtone_client::parser::Patterns;
use dialtone_client::{envelope, merge, Accuracy, BackendError, ConversationKind, PatternConfig};

fn patterns() -> Patterns {
    Patterns::compile(&PatternConfig::default()).unwrap()
}

fn feed_envelope(json: &str, html: &str) -> Vec<u8> {
    format!(
        "<response>\n  <json><![CDATA[{json}]]></json>\n  <html><![CDATA[{html}]]></html>\n</response>"
    )
    .into_bytes()
}

const VOICEMAIL_HTML: &str = r##"
 <div id="vm01" class="gc-message gc-message-unread">
  <span class="gc-message-time">7/4/10 9:15 AM</span>
  <span class="gc-message-relative">3 weeks ago</span>
  <a class="gc-under gc-message-name-link" href="/voice/b?contactId=k9">Carol</a>
  <input type="hidden" class="gc-text gc-quickcall-ac" value="+15550002222" />
  <span class="gc-message-type">(555) 000-2222</span>
  <span class="gc-message-location">Portland, OR</span>
  <span id="1-0" class="gc-word-high">call</span>
  <span id="1-1" class="gc-word-med2">me</span>
  <a href="#" class="gc-message-mni">555 000 3333</a>
 </div>
 <div id="vm02" class="gc-message">
  <span class="gc-message-relative">1 month ago</span>
 </div>
"##;

#[test]
fn voicemail_feed_round_trip() {
    let json = r#"{
        "messages": {
            "vm01": {"isRead": false, "isSpam": false, "isTrash": false, "labels": ["inbox", "voicemail"]},
            "vm02": {"isRead": true, "isSpam": false, "isTrash": false, "labels": ["voicemail"]}
        },
        "unreadCounts": {"voicemail": 1} // legacy trailing comment
    }"#;
    let (tree, html) = envelope::split(&feed_envelope(json, VOICEMAIL_HTML)).unwrap();
    let records = patterns().parse(&html, ConversationKind::Voicemail);
    let conversations = merge::merge(records, &tree, ConversationKind::Voicemail).unwrap();

    assert_eq!(conversations.len(), 2);

    let first = &conversations[0];
    assert_eq!(first.id, "vm01");
    assert_eq!(first.name, "Carol");
    assert_eq!(first.number, "+15550002222");
    assert_eq!(first.contact_id, "k9");
    assert_eq!(first.time, Utc.with_ymd_and_hms(2010, 7, 4, 9, 15, 0).unwrap());
    assert!(!first.is_read);
    assert!(!first.is_archived, "inbox label present");
    let texts = &first.messages[0].texts;
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0].accuracy, Accuracy::High);
    assert_eq!(texts[1].accuracy, Accuracy::Medium);
    assert_eq!(texts[2].text, "555 000 3333");

    let second = &conversations[1];
    assert!(second.is_read);
    assert!(second.is_archived, "no inbox label");
    // No transcript markup at all still yields a message.
    assert_eq!(second.messages[0].texts[0].text, "No Transcription");
    // Missing time string falls back to the sentinel instead of failing the fetch.
    assert_eq!(second.time.year(), 1);
}

#[test]
fn sms_feed_round_trip() {
    let html = r#"
 <div id="sms9" class="gc-message">
  <span class="gc-message-relative">5 minutes ago</span>
  <span class="gc-message-sms-from">Dan:</span>
  <span class="gc-message-sms-text">lunch?</span>
  <span class="gc-message-sms-time">11:58 AM</span>
  <span class="gc-message-sms-from">Me:</span>
  <span class="gc-message-sms-text">give me 10</span>
  <span class="gc-message-sms-time">12:01 PM</span>
 </div>
"#;
    let json = r#"{"messages": {"sms9": {"isRead": true, "labels": ["inbox", "sms"]}}}"#;
    let (tree, html) = envelope::split(&feed_envelope(json, html)).unwrap();
    let records = patterns().parse(&html, ConversationKind::Sms);
    let conversations = merge::merge(records, &tree, ConversationKind::Sms).unwrap();

    assert_eq!(conversations.len(), 1);
    let c = &conversations[0];
    assert_eq!(c.kind, ConversationKind::Sms);
    assert_eq!(c.messages.len(), 2);
    assert_eq!(c.messages[0].who_from, "Dan:");
    assert_eq!(c.messages[0].when, "11:58 AM");
    assert_eq!(c.messages[1].texts[0].text, "give me 10");
}

#[test]
fn halves_out_of_sync_is_a_hard_error() {
    // JSON half only knows vm01; HTML half carries both blocks.
    let json = r#"{"messages": {"vm01": {"isRead": false, "labels": ["inbox"]}}}"#;
    let (tree, html) = envelope::split(&feed_envelope(json, VOICEMAIL_HTML)).unwrap();
    let records = patterns().parse(&html, ConversationKind::Voicemail);
    let err = merge::merge(records, &tree, ConversationKind::Voicemail).unwrap_err();
    match err {
        BackendError::OutOfSync { id } => assert_eq!(id, "vm02"),
        other => panic!("expected OutOfSync, got {other:?}"),
    }
}

#[test]
fn malformed_envelope_fails_loudly() {
    let only_json = b"<response><json><![CDATA[{}]]></json></response>";
    assert!(matches!(
        envelope::split(only_json),
        Err(BackendError::Envelope(_))
    ));
}
