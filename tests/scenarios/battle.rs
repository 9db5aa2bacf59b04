//! Battle scenario tests
//!
//! Turn order, moves, switching, and playing a battle out to the end

use crate::harness::TestServer;
use serde_json::Value;

/// Test: Only the player whose turn it is may act; both see the result
#[tokio::test]
async fn test_turns_alternate() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, mut gary) = server.battle("ash", "gary").await.unwrap();

    // Tackle can't knock out a full-HP level 50 species
    let reply = ash.attack(3).await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    let data = &reply["data"];
    assert_eq!(data["event"], "ATTACK");
    assert_eq!(data["attacker"], "ash");
    assert_eq!(data["moveName"], "Tackle");
    assert_eq!(data["nextTurn"], "gary");
    assert_eq!(data["targetFainted"], false);
    assert!(data["winner"].is_null());

    // The same event is pushed to both players
    let pushed = ash.expect_event("ATTACK").await.unwrap();
    assert_eq!(&pushed, data);
    let pushed = gary.expect_event("ATTACK").await.unwrap();
    assert_eq!(&pushed, data);

    let reply = ash.attack(3).await.unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "it is not your turn");

    let reply = gary.attack(3).await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    assert_eq!(reply["data"]["nextTurn"], "ash");
}

/// Test: An out-of-turn attack changes nothing
#[tokio::test]
async fn test_out_of_turn_has_no_effect() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, mut gary) = server.battle("ash", "gary").await.unwrap();

    let before = ash.state().await.unwrap()["data"].clone();
    let reply = gary.attack(0).await.unwrap();
    assert_eq!(reply["error"], "it is not your turn");
    let after = ash.state().await.unwrap()["data"].clone();

    assert_eq!(before["sides"], after["sides"]);
    assert_eq!(after["currentTurn"], "ash");
    assert!(gary.drain().await.iter().all(|m| m["data"]["event"] != "ATTACK"));
}

/// Test: Move indexes outside the moveset are rejected
#[tokio::test]
async fn test_invalid_move_index() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, _gary) = server.battle("ash", "gary").await.unwrap();

    let reply = ash.attack(7).await.unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "no move at index 7");

    // Still ash's turn
    let reply = ash.attack(0).await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
}

/// Test: A voluntary switch uses up the turn
#[tokio::test]
async fn test_voluntary_switch() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, mut gary) = server.battle("ash", "gary").await.unwrap();

    let reply = ash.switch(0).await.unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "slot 0 is already battling");

    let reply = ash.switch(9).await.unwrap();
    assert_eq!(reply["error"], "no roster slot at index 9");

    let reply = ash.switch(1).await.unwrap();
    assert_eq!(reply["success"], true, "{}", reply);
    let data = &reply["data"];
    assert_eq!(data["event"], "SWITCH");
    assert_eq!(data["trainer"], "ash");
    assert_eq!(data["index"], 1);
    assert_eq!(data["forced"], false);
    assert_eq!(data["nextTurn"], "gary");

    let pushed = gary.expect_event("SWITCH").await.unwrap();
    assert_eq!(pushed["species"], data["species"]);

    let state = gary.state().await.unwrap();
    let ash_side = side_of(&state["data"], "ash");
    assert_eq!(ash_side["activeIndex"], 1);
}

/// Test: GET_STATE reports both rosters and the caller's moves
#[tokio::test]
async fn test_state_snapshot() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (mut ash, _gary) = server.battle("ash", "gary").await.unwrap();

    let reply = ash.state().await.unwrap();
    assert_eq!(reply["success"], true);
    let state = &reply["data"];
    assert_eq!(state["phase"], "WAITING_FOR_ACTION");
    assert_eq!(state["terminal"], false);
    assert!(state["winner"].is_null());
    assert_eq!(state["moves"].as_array().unwrap().len(), 4);

    let sides = state["sides"].as_array().unwrap();
    assert_eq!(sides.len(), 2);
    for side in sides {
        let roster = side["roster"].as_array().unwrap();
        assert_eq!(roster.len(), 3);
        for slot in roster {
            assert_eq!(slot["currentHp"], slot["maxHp"]);
            assert_eq!(slot["fainted"], false);
        }
    }
}

/// Test: Play until someone wins; the room is gone afterwards
#[tokio::test]
async fn test_battle_runs_to_a_winner() {
    // Every hit deals at least 1 so no matchup can stall the battle
    let server = TestServer::start_with_env(&[
        ("BATTLED_RATE_LIMIT__COOLDOWN_MS", "0"),
        ("BATTLED_RATE_LIMIT__MAX_REQUESTS", "100000"),
        ("BATTLED_IMMUNITY_POLICY", "minimum_one"),
    ])
    .await
    .expect("Failed to start server");
    let (ash, gary) = server.battle("ash", "gary").await.unwrap();
    let names = ["ash", "gary"];
    let mut clients = [ash, gary];

    let mut turn = 0;
    let mut must_switch = false;
    let mut winner = None;
    let mut forced_switches = 0;

    for _ in 0..2000 {
        let actor = &mut clients[turn];
        let reply = if must_switch {
            let state = actor.state().await.unwrap();
            let index = first_healthy(side_of(&state["data"], names[turn]))
                .expect("a side that must switch has a healthy slot");
            forced_switches += 1;
            actor.switch(index).await.unwrap()
        } else {
            actor.attack(0).await.unwrap()
        };
        assert_eq!(reply["success"], true, "{}", reply);

        let data = &reply["data"];
        if let Some(name) = data["winner"].as_str() {
            winner = Some(name.to_string());
            break;
        }
        if data["event"] == "SWITCH" {
            assert_eq!(data["forced"], must_switch);
        }
        must_switch = data["event"] == "ATTACK" && data["targetFainted"] == true;
        let next = data["nextTurn"].as_str().unwrap();
        if must_switch {
            // The fainted side moves next, and only by switching
            assert_ne!(next, names[turn]);
            let blocked = clients[1 - turn].attack(0).await.unwrap();
            assert_eq!(blocked["error"], "a fainted pokemon must be replaced first");
        }
        turn = names.iter().position(|n| *n == next).unwrap();
    }

    let winner = winner.expect("battle did not finish");
    assert!(names.contains(&winner.as_str()));
    // With three slots each, the loser replaced a fainted slot twice
    assert!(forced_switches >= 2);

    // Both players saw the final event and are free again
    for client in clients.iter_mut() {
        let events = client.drain().await;
        assert!(events
            .iter()
            .any(|e| e["data"]["winner"] == winner.as_str()));
        let reply = client.leave().await.unwrap();
        assert_eq!(reply["error"], "NOT_IN_BATTLE");
    }

    let reply = clients[0].join("ash").await.unwrap();
    assert_eq!(reply["data"]["status"], "WAITING_OPPONENT");
}

fn side_of<'a>(state: &'a Value, trainer: &str) -> &'a Value {
    state["sides"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["trainer"] == trainer)
        .unwrap()
}

fn first_healthy(side: &Value) -> Option<usize> {
    side["roster"]
        .as_array()?
        .iter()
        .position(|slot| slot["fainted"] == false)
}
