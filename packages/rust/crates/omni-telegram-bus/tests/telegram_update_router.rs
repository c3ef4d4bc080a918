#![allow(missing_docs)]

use std::sync::Arc;

use omni_telegram_bus::test_support::RecordingBus;
use omni_telegram_bus::{GatewayError, Update, UpdateKind, UpdateRouter};

fn router(bus: &Arc<RecordingBus>) -> UpdateRouter {
    UpdateRouter::new(bus.clone(), "telegram")
}

#[test]
fn decodes_each_recognized_kind() {
    let cases = [
        (r#"{"update_id":1,"message":{"text":"hi"}}"#, UpdateKind::Message),
        (r#"{"update_id":2,"edited_message":{"text":"hi!"}}"#, UpdateKind::EditedMessage),
        (r#"{"update_id":3,"callback_query":{"id":"cb"}}"#, UpdateKind::CallbackQuery),
        (r#"{"update_id":4,"inline_query":{"id":"iq"}}"#, UpdateKind::InlineQuery),
        (r#"{"update_id":5,"channel_post":{"text":"news"}}"#, UpdateKind::Unknown),
    ];
    for (body, kind) in cases {
        let update = Update::from_slice(body.as_bytes()).expect("decode");
        assert_eq!(update.kind(), kind, "{body}");
    }
}

#[test]
fn missing_update_id_defaults_to_zero() {
    let update = Update::from_slice(br#"{"message":{"text":"hi"}}"#).expect("decode");
    assert_eq!(update.update_id(), 0);
}

#[test]
fn non_object_bodies_are_protocol_errors() {
    let bodies: [&[u8]; 5] = [b"[]", b"42", b"\"text\"", b"{not json", b""];
    for body in bodies {
        assert!(matches!(
            Update::from_slice(body),
            Err(GatewayError::Protocol(_))
        ));
    }
    assert!(matches!(
        Update::from_slice(br#"{"update_id":"seven"}"#),
        Err(GatewayError::Protocol(_))
    ));
}

#[tokio::test]
async fn single_kind_update_publishes_full_and_scoped_payloads() {
    let cases = [
        ("message", "message"),
        ("edited_message", "edited"),
        ("callback_query", "callback"),
        ("inline_query", "inline"),
    ];
    for (field, leaf) in cases {
        let bus = Arc::new(RecordingBus::new());
        let body = format!(r#"{{"update_id":77,"{field}":{{"id":"x","n":1}}}}"#);
        let update = Update::from_slice(body.as_bytes()).expect("decode");

        let published = router(&bus).route("bot1", &update).await;

        assert_eq!(published, 2);
        let messages = bus.published();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "telegram.bot1.in.update");
        assert_eq!(&messages[0].payload[..], body.as_bytes());
        assert_eq!(messages[1].subject, format!("telegram.bot1.in.{leaf}"));
        assert_eq!(&messages[1].payload[..], br#"{"id":"x","n":1}"#);
    }
}

#[tokio::test]
async fn unknown_update_publishes_only_the_full_update() {
    let bus = Arc::new(RecordingBus::new());
    let body = br#"{"update_id":9,"poll":{"id":"p1","question":"?"}}"#;
    let update = Update::from_slice(body).expect("decode");

    assert_eq!(router(&bus).route("bot1", &update).await, 1);

    let messages = bus.published();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "telegram.bot1.in.update");
    assert_eq!(&messages[0].payload[..], &body[..]);
}

#[tokio::test]
async fn message_wins_over_callback_query() {
    let bus = Arc::new(RecordingBus::new());
    let update = Update::from_slice(
        br#"{"update_id":10,"callback_query":{"id":"cb"},"message":{"text":"m"}}"#,
    )
    .expect("decode");
    assert_eq!(update.kind(), UpdateKind::Message);

    router(&bus).route("bot1", &update).await;

    assert_eq!(bus.published_on("telegram.bot1.in.message").len(), 1);
    assert!(bus.published_on("telegram.bot1.in.callback").is_empty());
}

#[tokio::test]
async fn full_update_keeps_unmodelled_fields() {
    let bus = Arc::new(RecordingBus::new());
    let body = br#"{"update_id":11,"message":{"text":"m","entities":[{"type":"bold"}]},"business_connection":{"id":"b"}}"#;
    let update = Update::from_slice(body).expect("decode");

    router(&bus).route("bot1", &update).await;

    let full = bus.published_on("telegram.bot1.in.update");
    let value: serde_json::Value = serde_json::from_slice(&full[0]).expect("json");
    assert_eq!(value["business_connection"]["id"], "b");
    assert_eq!(value["message"]["entities"][0]["type"], "bold");
}

#[tokio::test]
async fn publish_failures_do_not_stop_routing() {
    let bus = Arc::new(RecordingBus::new());
    let router = router(&bus);
    let update = Update::from_slice(br#"{"update_id":12,"message":{"text":"m"}}"#).expect("decode");

    bus.set_fail_publish(true);
    assert_eq!(router.route("bot1", &update).await, 0);
    assert!(bus.published().is_empty());

    bus.set_fail_publish(false);
    assert_eq!(router.route("bot1", &update).await, 2);
}

#[tokio::test]
async fn custom_prefix_scopes_subjects() {
    let bus = Arc::new(RecordingBus::new());
    let update = Update::from_slice(br#"{"update_id":13,"inline_query":{"id":"q"}}"#).expect("decode");

    UpdateRouter::new(bus.clone(), "acme.tg")
        .route("support", &update)
        .await;

    let subjects: Vec<_> = bus.published().into_iter().map(|m| m.subject).collect();
    assert_eq!(
        subjects,
        vec!["acme.tg.support.in.update", "acme.tg.support.in.inline"]
    );
}

#[test]
fn updates_deserialize_inside_envelopes() {
    let updates: Vec<Update> = serde_json::from_str(
        r#"[{"update_id":1,"message":{"text":"a"}},{"update_id":2,"inline_query":{"id":"q"}}]"#,
    )
    .expect("decode list");
    let ids: Vec<_> = updates.iter().map(Update::update_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(updates[1].kind(), UpdateKind::InlineQuery);
}
