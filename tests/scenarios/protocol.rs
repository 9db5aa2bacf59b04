//! Protocol error scenario tests
//!
//! Bad input is answered with `success=false` and the connection stays usable

use serde_json::json;

use crate::harness::TestServer;

/// Test: Malformed JSON gets an error reply, then the connection still works
#[tokio::test]
async fn test_malformed_json() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send_raw("{this is not json").await.unwrap();
    let reply = client.recv_json_timeout(std::time::Duration::from_secs(5)).await.unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["requestId"], "");
    assert!(reply["error"].as_str().unwrap().contains("malformed"));
    assert!(reply.get("data").is_none());

    let reply = client.join("ash").await.unwrap();
    assert_eq!(reply["success"], true);
}

/// Test: Unknown services and methods are errors, keyed to the request
#[tokio::test]
async fn test_unknown_selectors() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let reply = client
        .request("BattleService", "DANCE", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().contains("DANCE"));

    let reply = client
        .request("ShopService", "BUY", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);
}

/// Test: Parameters are checked and numbers are coerced
#[tokio::test]
async fn test_parameters() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, _gary) = server.battle("ash", "gary").await.unwrap();

    let reply = ash.battle("ATTACK", json!({})).await.unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().contains("moveIndex"));

    let reply = ash
        .battle("ATTACK", json!({ "moveIndex": "first" }))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);

    let reply = ash
        .battle("ATTACK", json!({ "moveIndex": -1.0 }))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);

    // 3.0 and "3" both mean move 3
    let reply = ash
        .battle("ATTACK", json!({ "moveIndex": "3" }))
        .await
        .unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    assert_eq!(reply["data"]["moveName"], "Tackle");
}

/// Test: An oversized line is answered with an error and skipped
#[tokio::test]
async fn test_oversized_line() {
    let server = TestServer::start_with_env(&[
        ("BATTLED_RATE_LIMIT__COOLDOWN_MS", "0"),
        ("BATTLED_MAX_LINE_BYTES", "1024"),
    ])
    .await
    .expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let padding = "x".repeat(4096);
    let line = json!({
        "requestId": "big",
        "service": "PokemonService",
        "method": "GET_TYPES",
        "params": { "padding": padding },
    });
    client.send_raw(&line.to_string()).await.unwrap();
    let reply = client
        .recv_json_timeout(std::time::Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().contains("exceeds 1024 bytes"));

    // The next line is read normally
    let reply = client
        .request("PokemonService", "GET_TYPES", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], true);
}
