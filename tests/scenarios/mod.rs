//! Scenario Tests for battled
//!
//! End-to-end play scenarios over real sockets:
//! - Matchmaking: queueing, pairing, duplicate joins
//! - Battle: turn order, moves, switching, playing to a winner
//! - Disconnect: leaving and dropped sockets
//! - Services: login, species and team lookups
//! - Protocol: malformed and unknown requests
//! - Rate limit: silent refusal of bursts

pub mod battle;
pub mod disconnect;
pub mod matchmaking;
pub mod protocol;
pub mod rate_limit;
pub mod services;
