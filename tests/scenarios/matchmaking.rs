//! Matchmaking scenario tests

use crate::harness::TestServer;

/// Test: Two joins pair up into one battle and the waiting player is told
#[tokio::test]
async fn test_two_players_are_matched() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ash = server.connect().await.unwrap();
    let mut gary = server.connect().await.unwrap();

    let waiting = ash.join("ash").await.unwrap();
    assert_eq!(waiting["success"], true);
    assert_eq!(waiting["data"]["status"], "WAITING_OPPONENT");
    let battle_id = waiting["data"]["battleId"].as_str().unwrap().to_string();

    let started = gary.join("gary").await.unwrap();
    assert_eq!(started["success"], true);
    assert_eq!(started["data"]["status"], "BATTLE_STARTED");
    assert_eq!(started["data"]["battleId"], battle_id.as_str());
    assert_eq!(started["data"]["opponent"], "ash");

    let event = ash.expect_event("BATTLE_STARTED").await.unwrap();
    assert_eq!(event["battleId"], battle_id.as_str());
    assert_eq!(event["opponent"], "gary");
    assert_eq!(event["firstTurn"], "ash");

    // Both see the same battle from their side
    let ash_state = ash.state().await.unwrap();
    let gary_state = gary.state().await.unwrap();
    assert_eq!(ash_state["data"]["currentTurn"], "ash");
    assert_eq!(gary_state["data"]["currentTurn"], "ash");
}

/// Test: A mapped username cannot queue again from any connection
#[tokio::test]
async fn test_already_in_battle() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut ash = server.connect().await.unwrap();
    ash.join("ash").await.unwrap();

    let again = ash.join("ash").await.unwrap();
    assert_eq!(again["success"], false);
    assert_eq!(again["error"], "ALREADY_IN_BATTLE");

    let mut impostor = server.connect().await.unwrap();
    let reply = impostor.join("ash").await.unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "ALREADY_IN_BATTLE");

    // A connection already queued cannot switch names either
    let reply = ash.join("red").await.unwrap();
    assert_eq!(reply["error"], "ALREADY_IN_BATTLE");
}

/// Test: A third player opens a fresh room
#[tokio::test]
async fn test_third_player_waits() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_ash, _gary) = server.battle("ash", "gary").await.unwrap();

    let mut misty = server.connect().await.unwrap();
    let reply = misty.join("misty").await.unwrap();
    assert_eq!(reply["data"]["status"], "WAITING_OPPONENT");

    let mut brock = server.connect().await.unwrap();
    let reply = brock.join("brock").await.unwrap();
    assert_eq!(reply["data"]["status"], "BATTLE_STARTED");
    assert_eq!(reply["data"]["opponent"], "misty");
}

/// Test: Usernames are validated before queueing
#[tokio::test]
async fn test_invalid_username() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    for name in ["", "has space", "waaaaaaaaaaaaaaaaaaaaaaaay-too-long"] {
        let reply = client.join(name).await.unwrap();
        assert_eq!(reply["success"], false, "{:?} accepted", name);
        assert_eq!(reply["error"], "INVALID_USERNAME");
    }
}

/// Test: Battle commands before joining are refused
#[tokio::test]
async fn test_commands_before_join() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let reply = client.attack(0).await.unwrap();
    assert_eq!(reply["error"], "NOT_IN_BATTLE");

    client.join("ash").await.unwrap();
    let reply = client.attack(0).await.unwrap();
    assert_eq!(reply["error"], "WAITING_FOR_OPPONENT");
}
