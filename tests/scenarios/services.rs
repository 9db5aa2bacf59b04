//! Auxiliary service scenario tests
//!
//! Login, species lookups, and team generation

use serde_json::json;

use crate::harness::{TestServer, ADMIN_PASSWORD, ADMIN_USERNAME};

/// Test: LOGIN checks credentials and reports admin rights
#[tokio::test]
async fn test_login() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let reply = client
        .request(
            "UserService",
            "LOGIN",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        )
        .await
        .unwrap();
    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["authenticated"], true);
    assert_eq!(reply["data"]["admin"], true);

    let reply = client
        .request(
            "UserService",
            "LOGIN",
            json!({ "username": ADMIN_USERNAME, "password": "wrong-password" }),
        )
        .await
        .unwrap();
    assert_eq!(reply["data"]["authenticated"], false);
    assert_eq!(reply["data"]["admin"], false);
}

/// Test: Species lookups by id, at random, and the type list
#[tokio::test]
async fn test_species_lookups() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let reply = client
        .request("PokemonService", "GET_BY_ID", json!({ "id": 25.0 }))
        .await
        .unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    assert_eq!(reply["data"]["name"], "Pikachu");
    assert_eq!(reply["data"]["moves"].as_array().unwrap().len(), 4);

    let reply = client
        .request("PokemonService", "GET_BY_ID", json!({ "id": 9999 }))
        .await
        .unwrap();
    assert_eq!(reply["success"], false);

    let reply = client
        .request("PokemonService", "GET_RANDOM", json!({ "count": 2 }))
        .await
        .unwrap();
    let picked = reply["data"].as_array().unwrap();
    assert_eq!(picked.len(), 2);
    assert_ne!(picked[0]["id"], picked[1]["id"]);

    let reply = client
        .request("PokemonService", "GET_TYPES", json!({}))
        .await
        .unwrap();
    let types: Vec<&str> = reply["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t.as_str())
        .collect();
    assert!(types.contains(&"Fire"));
    assert!(types.contains(&"Ghost"));
}

/// Test: RANDOM_TEAM builds distinct species with movesets
#[tokio::test]
async fn test_random_team() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    let reply = client
        .request("TeamService", "RANDOM_TEAM", json!({ "size": 6.0 }))
        .await
        .unwrap();
    let team = reply["data"].as_array().unwrap();
    assert_eq!(team.len(), 6);
    for member in team {
        assert_eq!(member["moves"].as_array().unwrap().len(), 4);
        assert_eq!(member["moves"][3]["name"], "Tackle");
    }

    for size in [0, 7] {
        let reply = client
            .request("TeamService", "RANDOM_TEAM", json!({ "size": size }))
            .await
            .unwrap();
        assert_eq!(reply["success"], false, "size {} accepted", size);
    }
}
