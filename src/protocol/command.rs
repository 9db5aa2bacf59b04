//! Typed requests
//!
//! Each `service`/`method` pair decodes into one `Command` variant with
//! its own parameters. Unknown pairs are a protocol error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{index_param, str_param, ProtocolError, Request, Service};

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // BattleService
    JoinQueue { username: String },
    Attack { move_index: usize },
    SwitchPokemon { index: usize },
    GetState,
    LeaveBattle,

    // UserService
    Login { username: String, password: String },

    // PokemonService
    GetSpecies { id: u32 },
    GetRandomSpecies { count: usize },
    GetTypes,

    // TeamService
    RandomTeam { size: usize },
}

impl Command {
    pub fn service(&self) -> Service {
        match self {
            Command::JoinQueue { .. }
            | Command::Attack { .. }
            | Command::SwitchPokemon { .. }
            | Command::GetState
            | Command::LeaveBattle => Service::BattleService,
            Command::Login { .. } => Service::UserService,
            Command::GetSpecies { .. } | Command::GetRandomSpecies { .. } | Command::GetTypes => {
                Service::PokemonService
            }
            Command::RandomTeam { .. } => Service::TeamService,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Command::JoinQueue { .. } => "JOIN_QUEUE",
            Command::Attack { .. } => "ATTACK",
            Command::SwitchPokemon { .. } => "SWITCH_POKEMON",
            Command::GetState => "GET_STATE",
            Command::LeaveBattle => "LEAVE_BATTLE",
            Command::Login { .. } => "LOGIN",
            Command::GetSpecies { .. } => "GET_BY_ID",
            Command::GetRandomSpecies { .. } => "GET_RANDOM",
            Command::GetTypes => "GET_TYPES",
            Command::RandomTeam { .. } => "RANDOM_TEAM",
        }
    }

    /// Wire parameters. Numbers go out as floats, like every client sends them.
    pub fn params(&self) -> Map<String, Value> {
        let value = match self {
            Command::JoinQueue { username } => json!({ "username": username }),
            Command::Attack { move_index } => json!({ "moveIndex": *move_index as f64 }),
            Command::SwitchPokemon { index } => json!({ "pokemonIndex": *index as f64 }),
            Command::Login { username, password } => {
                json!({ "username": username, "password": password })
            }
            Command::GetSpecies { id } => json!({ "id": *id as f64 }),
            Command::GetRandomSpecies { count } => json!({ "count": *count as f64 }),
            Command::RandomTeam { size } => json!({ "size": *size as f64 }),
            Command::GetState | Command::LeaveBattle | Command::GetTypes => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Wrap in a request envelope with a fresh id
    pub fn into_request(self) -> Request {
        Request::new(self.service(), self.method(), self.params())
    }

    /// Decode a request envelope
    pub fn from_request(request: &Request) -> Result<Self, ProtocolError> {
        let p = &request.params;
        let command = match (request.service, request.method.as_str()) {
            (Service::BattleService, "JOIN_QUEUE") => Command::JoinQueue {
                username: str_param(p, "username")?,
            },
            (Service::BattleService, "ATTACK") => Command::Attack {
                move_index: index_param(p, "moveIndex")?,
            },
            (Service::BattleService, "SWITCH_POKEMON") => Command::SwitchPokemon {
                index: index_param(p, "pokemonIndex")?,
            },
            (Service::BattleService, "GET_STATE") => Command::GetState,
            (Service::BattleService, "LEAVE_BATTLE") => Command::LeaveBattle,
            (Service::UserService, "LOGIN") => Command::Login {
                username: str_param(p, "username")?,
                password: str_param(p, "password")?,
            },
            (Service::PokemonService, "GET_BY_ID") => {
                let id = index_param(p, "id")?;
                Command::GetSpecies {
                    id: u32::try_from(id).map_err(|_| ProtocolError::InvalidParam {
                        name: "id",
                        reason: format!("{} is out of range", id),
                    })?,
                }
            }
            (Service::PokemonService, "GET_RANDOM") => Command::GetRandomSpecies {
                count: index_param(p, "count")?,
            },
            (Service::PokemonService, "GET_TYPES") => Command::GetTypes,
            (Service::TeamService, "RANDOM_TEAM") => Command::RandomTeam {
                size: index_param(p, "size")?,
            },
            (service, method) => {
                return Err(ProtocolError::UnknownMethod {
                    service,
                    method: method.to_string(),
                })
            }
        };
        Ok(command)
    }
}

/// Outcome of `JOIN_QUEUE`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum JoinStatus {
    WaitingOpponent { battle_id: String },
    BattleStarted { battle_id: String, opponent: String },
}

impl JoinStatus {
    pub fn battle_id(&self) -> &str {
        match self {
            JoinStatus::WaitingOpponent { battle_id }
            | JoinStatus::BattleStarted { battle_id, .. } => battle_id,
        }
    }
}
