//! battle_client - interactive line client for battled

use std::time::Duration;

use anyhow::Result;
use battled::client::{BattleClient, ClientError};
use battled::protocol::{Event, JoinStatus};
use battled::DEFAULT_PORT;
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Battle server client
#[derive(Parser, Debug)]
#[command(name = "battle_client", version, about = "Play battles against other trainers")]
struct Args {
    /// Server host
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect and per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

const HELP: &str = "\
join <name>        queue for a battle
attack <n>         use move n (0-3)
switch <n>         switch to team slot n
state              show the battle
leave              leave the battle
login <user> <pw>  check credentials
types              list known types
team <n>           show a random team of n
quit               exit";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "battled=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let client = BattleClient::connect(&addr, Duration::from_secs(args.timeout_secs)).await?;
    println!("connected to {}; type 'help' for commands", addr);

    client.on_event(|event| println!("{}", describe_event(&event)));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, rest)) = words.split_first() else {
            continue;
        };

        let result = match (verb, rest) {
            ("quit" | "exit", _) => break,
            ("help", _) => {
                println!("{}", HELP);
                Ok(())
            }
            ("join", [name]) => client.join_queue(name).await.map(|status| match status {
                JoinStatus::WaitingOpponent { battle_id } => {
                    println!("waiting for an opponent (battle {})", battle_id)
                }
                JoinStatus::BattleStarted { battle_id, opponent } => {
                    println!("battle {} started against {}", battle_id, opponent)
                }
            }),
            ("attack", [n]) => match n.parse() {
                // The pushed event is printed by the callback
                Ok(n) => client.attack(n).await.map(|_| ()),
                Err(_) => usage(),
            },
            ("switch", [n]) => match n.parse() {
                Ok(n) => client.switch_pokemon(n).await.map(|_| ()),
                Err(_) => usage(),
            },
            ("state", []) => client.get_state().await.map(|state| print_state(&state)),
            ("leave", []) => client.leave_battle().await.map(|_| println!("left the battle")),
            ("login", [user, password]) => client.login(user, password).await.map(|r| {
                println!("authenticated: {}, admin: {}", r.authenticated, r.admin)
            }),
            ("types", []) => client
                .get_types()
                .await
                .map(|types| println!("{}", types.join(", "))),
            ("team", [n]) => match n.parse() {
                Ok(n) => client.random_team(n).await.map(|team| print_team(&team)),
                Err(_) => usage(),
            },
            _ => usage(),
        };

        match result {
            Ok(()) => {}
            Err(ClientError::Rejected(reason)) => println!("refused: {}", reason),
            Err(e) => {
                println!("connection error: {}", e);
                break;
            }
        }
    }

    let _ = client.close().await;
    Ok(())
}

fn usage() -> Result<(), ClientError> {
    println!("{}", HELP);
    Ok(())
}

fn describe_event(event: &Event) -> String {
    match event {
        Event::BattleStarted { opponent, first_turn, .. } => {
            format!("* {} joined; {} moves first", opponent, first_turn)
        }
        Event::Attack {
            message,
            next_turn,
            winner,
            ..
        } => match winner {
            Some(winner) => format!("* {}\n* {} won!", message, winner),
            None => format!("* {}\n* {} to act", message, next_turn),
        },
        Event::Switch { message, next_turn, .. } => {
            format!("* {}\n* {} to act", message, next_turn)
        }
        Event::OpponentLeft { opponent, .. } => format!("* {} left the battle", opponent),
    }
}

fn print_state(state: &Value) {
    println!(
        "phase {} | turn: {}",
        state["phase"].as_str().unwrap_or("?"),
        state["currentTurn"].as_str().unwrap_or("?")
    );
    for side in state["sides"].as_array().into_iter().flatten() {
        println!("{}:", side["trainer"].as_str().unwrap_or("?"));
        let active = side["activeIndex"].as_u64();
        for (i, slot) in side["roster"].as_array().into_iter().flatten().enumerate() {
            let marker = if active == Some(i as u64) { '>' } else { ' ' };
            println!(
                " {}{} {:<12} {:>3}/{:<3}{}",
                marker,
                i,
                slot["name"].as_str().unwrap_or("?"),
                slot["currentHp"],
                slot["maxHp"],
                if slot["fainted"] == true { " fainted" } else { "" }
            );
        }
    }
    for (i, mv) in state["moves"].as_array().into_iter().flatten().enumerate() {
        println!(
            "  move {}: {} ({}, power {})",
            i,
            mv["name"].as_str().unwrap_or("?"),
            mv["moveType"].as_str().unwrap_or("?"),
            mv["power"]
        );
    }
}

fn print_team(team: &Value) {
    for (i, member) in team.as_array().into_iter().flatten().enumerate() {
        let moves: Vec<&str> = member["moves"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|m| m["name"].as_str())
            .collect();
        println!(
            "{}: {} [{}]",
            i,
            member["name"].as_str().unwrap_or("?"),
            moves.join(", ")
        );
    }
}
