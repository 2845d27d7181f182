//! Webhook notification sink delivery and signing.

use bigdecimal::BigDecimal;
use mockito::Matcher;
use uuid::Uuid;

use ledger_core::domain::Direction;
use ledger_core::services::notifier::{NotificationSink, SettlementNotice, WebhookSink};

fn notice() -> SettlementNotice {
    SettlementNotice {
        account_id: Uuid::new_v4(),
        transaction_id: Uuid::new_v4(),
        outcome: "completed".to_string(),
        amount: "50.00".parse::<BigDecimal>().unwrap(),
        direction: Direction::Credit,
    }
}

#[tokio::test]
async fn test_delivers_signed_json_notice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hooks/settlements")
        .match_header("content-type", "application/json")
        .match_header(
            "x-ledger-signature",
            Matcher::Regex("^[0-9a-f]{64}$".to_string()),
        )
        .match_body(Matcher::PartialJson(serde_json::json!({
            "outcome": "completed",
            "direction": "credit",
        })))
        .with_status(200)
        .create_async()
        .await;

    let sink = WebhookSink::new(
        format!("{}/hooks/settlements", server.url()),
        Some("test-secret".to_string()),
    );

    sink.notify(&notice()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unsigned_when_no_secret_configured() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hooks/settlements")
        .match_header("x-ledger-signature", Matcher::Missing)
        .with_status(200)
        .create_async()
        .await;

    let sink = WebhookSink::new(format!("{}/hooks/settlements", server.url()), None);

    sink.notify(&notice()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejection_surfaces_as_error_for_the_caller_to_drop() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/hooks/settlements")
        .with_status(500)
        .create_async()
        .await;

    let sink = WebhookSink::new(format!("{}/hooks/settlements", server.url()), None);

    assert!(sink.notify(&notice()).await.is_err());
}
