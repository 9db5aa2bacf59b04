//! Rate limit scenario tests

use std::time::Duration;

use serde_json::json;

use crate::harness::TestServer;

/// Test: A second connection inside the cooldown is dropped without a reply
#[tokio::test]
async fn test_burst_is_refused_silently() {
    let server = TestServer::start_with_env(&[("BATTLED_RATE_LIMIT__COOLDOWN_MS", "1000")])
        .await
        .expect("Failed to start server");

    // Let the readiness check's cooldown expire
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let mut first = server.connect().await.unwrap();
    let reply = first
        .request("PokemonService", "GET_TYPES", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], true);

    let mut second = server.connect().await.unwrap();
    let _ = second.send("PokemonService", "GET_TYPES", json!({})).await;
    assert!(second.is_closed().await, "refused connection got a reply");

    // The accepted connection is unaffected
    let reply = first
        .request("PokemonService", "GET_TYPES", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], true);

    // After the cooldown the address is welcome again
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let mut third = server.connect().await.unwrap();
    let reply = third
        .request("PokemonService", "GET_TYPES", json!({}))
        .await
        .unwrap();
    assert_eq!(reply["success"], true);
}
