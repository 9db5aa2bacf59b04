//! Session and matchmaking
//!
//! - `lobby`: room table and username index behind one lock
//! - `room`: one actor task per running battle
//! - `connection`: per-socket read/dispatch/write loop

pub mod connection;
pub mod lobby;
pub mod room;

pub use connection::{serve, SessionContext};
pub use lobby::{ConnectionId, Lobby, LobbyError, LobbyStats};
pub use room::RoomHandle;
