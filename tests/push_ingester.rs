mod common;

use std::sync::Arc;

use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::json;

use common::{client_with, notification, record, RecordingHandler, ScriptedTransport};
use qimb_client::{PushOutcome, QimbClient};

#[tokio::test]
async fn confirmation_issues_one_get_and_no_callback() {
    let server = MockServer::start_async().await;
    let confirm_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/confirm");
            then.status(200).body("<ConfirmSubscriptionResponse/>");
        })
        .await;

    let client = QimbClient::setup(&server.base_url()).unwrap();
    let handler = Arc::new(RecordingHandler::new());
    let ingester = client.push_ingester(handler.clone());

    let body = json!({
        "Type": "SubscriptionConfirmation",
        "SubscribeURL": server.url("/confirm"),
    })
    .to_string();
    let outcome = ingester.ingest(body.as_bytes()).await;

    assert_eq!(outcome, PushOutcome::Confirmed);
    confirm_mock.assert_hits(1);
    assert_eq!(handler.count().await, 0);
}

#[tokio::test]
async fn failed_confirmation_is_reported_but_not_raised() {
    let server = MockServer::start_async().await;
    let confirm_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/confirm");
            then.status(404);
        })
        .await;

    let client = QimbClient::setup(&server.base_url()).unwrap();
    let handler = Arc::new(RecordingHandler::new());
    let ingester = client.push_ingester(handler.clone());

    let body = json!({
        "Type": "SubscriptionConfirmation",
        "SubscribeURL": server.url("/confirm"),
    })
    .to_string();
    assert_eq!(
        ingester.ingest(body.as_bytes()).await,
        PushOutcome::ConfirmationFailed
    );
    confirm_mock.assert_hits(1);
}

#[tokio::test]
async fn notification_is_routed_once() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_with(transport.clone(), 1000);
    let handler = Arc::new(RecordingHandler::new());
    let ingester = client.push_ingester(handler.clone());

    let body = r#"{"Type":"Notification","Message":"{\"messageId\":\"m1\",\"message\":\"hi\",\"senderNodeId\":\"n2\"}"}"#;
    assert_eq!(ingester.ingest(body.as_bytes()).await, PushOutcome::Delivered);
    assert_eq!(ingester.ingest(body.as_bytes()).await, PushOutcome::Duplicate);

    let envelopes = handler.envelopes().await;
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].message_id(), "m1");
    assert_eq!(envelopes[0].message(), "hi");
    assert_eq!(envelopes[0].sender_node_id(), "n2");
    assert_eq!(envelopes[0].receipt_handle(), None);
    assert!(transport.requests().await.is_empty());
}

#[tokio::test]
async fn malformed_or_unknown_bodies_are_ignored() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_with(transport.clone(), 1000);
    let handler = Arc::new(RecordingHandler::new());
    let ingester = client.push_ingester(handler.clone());

    let bodies = [
        "not json".to_string(),
        String::new(),
        json!({"Type": "UnsubscribeConfirmation"}).to_string(),
        json!({"Type": "SubscriptionConfirmation"}).to_string(),
        json!({"Type": "Notification"}).to_string(),
        json!({"Type": "Notification", "Message": "not json"}).to_string(),
        json!({"Type": "Notification", "Message": "{\"message\":\"no id\"}"}).to_string(),
        json!([1, 2, 3]).to_string(),
    ];
    for body in bodies {
        assert_eq!(ingester.ingest(body.as_bytes()).await, PushOutcome::Ignored);
    }
    assert_eq!(handler.count().await, 0);
    assert!(transport.requests().await.is_empty());
}

#[tokio::test]
async fn handler_failure_on_push_is_contained() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_with(transport, 1000);
    let handler = Arc::new(RecordingHandler::failing_on("bad"));
    let ingester = client.push_ingester(handler.clone());

    assert_eq!(
        ingester.ingest(notification("m1", "bad").as_bytes()).await,
        PushOutcome::CallbackFailed
    );
    assert_eq!(
        ingester.ingest(notification("m1", "bad").as_bytes()).await,
        PushOutcome::Duplicate
    );

    let handler = Arc::new(RecordingHandler::panicking_on("boom"));
    let ingester = client.push_ingester(handler);
    assert_eq!(
        ingester.ingest(notification("m2", "boom").as_bytes()).await,
        PushOutcome::CallbackFailed
    );
}

#[tokio::test]
async fn dedup_holds_across_poll_and_push_paths() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_batch(json!([
            record("m1", "one", Some("h1")),
            record("m2", "two", Some("h2")),
        ]))
        .await;
    let client = client_with(transport.clone(), 1000);
    let handler = Arc::new(RecordingHandler::new());
    let ingester = client.push_ingester(handler.clone());
    let dispatcher = client.poll_dispatcher(handler.clone());

    assert_eq!(
        ingester.ingest(notification("m2", "two").as_bytes()).await,
        PushOutcome::Delivered
    );

    let summary = dispatcher.tick().await.unwrap();
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.acknowledged, 2);

    assert_eq!(
        ingester.ingest(notification("m1", "one").as_bytes()).await,
        PushOutcome::Duplicate
    );
    assert_eq!(handler.ids().await, vec!["m1", "m2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pushes_of_one_message_deliver_once() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_with(transport, 1000);
    let handler = Arc::new(RecordingHandler::new());
    let ingester = Arc::new(client.push_ingester(handler.clone()));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let ingester = ingester.clone();
        tasks.push(tokio::spawn(async move {
            ingester.ingest(notification("m1", "hi").as_bytes()).await
        }));
    }
    let mut delivered = 0;
    for task in tasks {
        if task.await.unwrap() == PushOutcome::Delivered {
            delivered += 1;
        }
    }
    assert_eq!(delivered, 1);
    assert_eq!(handler.count().await, 1);
}
