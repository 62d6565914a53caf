use crate::event::parse_line_at;
use crate::fanout::{HelloPayload, Hub, WireMessage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const NOW: i64 = 1_761_118_429_598;

#[test]
fn envelopes_are_tagged() {
    let event = parse_line_at("2025-10-22 07:33:49,598\tINFO\tfdc\tround:1234", NOW);

    let line: Value = serde_json::from_str(&WireMessage::Line(event).to_json()).unwrap();
    let notice: Value = serde_json::from_str(&WireMessage::notice("hi", NOW).to_json()).unwrap();
    let hello: Value = serde_json::from_str(&WireMessage::hello(NOW).to_json()).unwrap();

    assert_eq!(line["type"], "line");
    assert_eq!(line["data"]["level"], "INFO");
    assert_eq!(line["data"]["parsed"], json!({ "round": 1234 }));
    assert_eq!(notice, json!({ "type": "notice", "data": { "msg": "hi", "ts": NOW } }));
    assert_eq!(hello, json!({ "type": "hello", "data": { "version": 1, "now": NOW } }));
}

#[test]
fn publish_without_subscribers_is_fine() {
    let hub = Hub::new(4);

    assert_eq!(hub.publish(&WireMessage::notice("nobody listening", NOW)), 0);
}

#[tokio::test]
async fn hello_comes_first_then_live_messages() {
    // Arrange
    let hub = Hub::new(8);
    let mut sub = hub.subscribe(NOW);

    // Act
    let delivered = hub.publish(&WireMessage::notice("first", NOW + 1));

    // Assert
    assert_eq!(delivered, 1);
    assert_eq!(
        sub.recv_message().await,
        Some(WireMessage::Hello(HelloPayload {
            version: 1,
            now: NOW
        }))
    );
    assert_eq!(
        sub.recv_message().await,
        Some(WireMessage::notice("first", NOW + 1))
    );
}

#[tokio::test]
async fn each_subscriber_gets_its_own_copy() {
    let hub = Hub::new(8);
    let mut a = hub.subscribe(NOW);
    let mut b = hub.subscribe(NOW);
    assert_eq!(hub.subscriber_count(), 2);

    hub.publish(&WireMessage::notice("both", NOW));
    drop(b.recv().await);
    drop(a.recv().await);

    assert_eq!(a.recv().await, b.recv().await);
}

#[tokio::test]
async fn slow_subscriber_skips_missed_frames() {
    // Arrange
    let hub = Hub::new(2);
    let mut sub = hub.subscribe(NOW);
    let _ = sub.recv().await;

    // Act
    for i in 0..5 {
        hub.publish(&WireMessage::notice(format!("n{i}"), NOW + i));
    }

    // Assert
    assert_eq!(sub.recv_message().await, Some(WireMessage::notice("n3", NOW + 3)));
    assert_eq!(sub.recv_message().await, Some(WireMessage::notice("n4", NOW + 4)));
    assert_eq!(sub.missed(), 3);
}

#[tokio::test]
async fn dropping_the_hub_ends_subscriptions() {
    let hub = Hub::new(2);
    let mut sub = hub.subscribe(NOW);
    drop(hub);

    assert!(sub.recv().await.is_some());
    assert_eq!(sub.recv().await, None);
}
