//! Disconnect scenario tests
//!
//! Leaving explicitly and dropping the socket both end the battle

use std::time::Duration;

use crate::harness::{TestClient, TestServer};

/// Test: LEAVE_BATTLE tells the opponent and frees both players
#[tokio::test]
async fn test_leave_notifies_opponent() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, mut gary) = server.battle("ash", "gary").await.unwrap();

    let reply = ash.leave().await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);

    let event = gary.expect_event("OPPONENT_LEFT").await.unwrap();
    assert_eq!(event["opponent"], "ash");

    let reply = gary.attack(0).await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE");
    let reply = gary.leave().await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE");

    // Both can queue again
    let reply = gary.join("gary").await.unwrap();
    assert_eq!(reply["data"]["status"], "WAITING_OPPONENT");
    let reply = ash.join("ash").await.unwrap();
    assert_eq!(reply["data"]["status"], "BATTLE_STARTED");
}

/// Test: A dropped socket counts as leaving
#[tokio::test]
async fn test_disconnect_counts_as_leave() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, gary) = server.battle("ash", "gary").await.unwrap();

    gary.close().await.unwrap();

    let event = ash.expect_event("OPPONENT_LEFT").await.unwrap();
    assert_eq!(event["opponent"], "gary");

    let reply = ash.state().await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE");

    // The name is free for a new connection
    let mut again = server.connect().await.unwrap();
    let reply = again.join("gary").await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
}

/// Test: A waiting player who disconnects leaves no ghost room behind
#[tokio::test]
async fn test_waiting_player_disconnects() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ash = server.connect().await.unwrap();
    ash.join("ash").await.unwrap();
    ash.close().await.unwrap();

    // Give the server a moment to notice the EOF
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut gary = server.connect().await.unwrap();
    let reply = gary.join("gary").await.unwrap();
    assert_eq!(reply["data"]["status"], "WAITING_OPPONENT");
}

/// Test: A connection that left cannot reach a later battle under its old name
#[tokio::test]
async fn test_reused_name_belongs_to_new_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut old_ash: TestClient = server.connect().await.unwrap();
    old_ash.join("ash").await.unwrap();
    let reply = old_ash.leave().await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);

    let (mut ash, mut misty) = server.battle("ash", "misty").await.unwrap();

    let reply = old_ash.attack(0).await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE", "{}", reply);
    let reply = old_ash.state().await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE", "{}", reply);
    let reply = old_ash.leave().await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE", "{}", reply);

    // Dropping the old socket does not end the new battle either
    old_ash.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let reply = ash.state().await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    assert_eq!(reply["data"]["currentTurn"], "ash");
    let reply = ash.attack(0).await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);

    let pending = misty.drain().await;
    assert!(pending
        .iter()
        .all(|msg| msg["data"]["event"] != "OPPONENT_LEFT"));
    let reply = misty.state().await.unwrap();
    assert_eq!(reply["data"]["currentTurn"], "misty");
}
