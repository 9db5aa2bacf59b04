//! Integration Test Harness
//!
//! End-to-end infrastructure for battled:
//! - `TestServer` - Spawns the real server binary on a random port
//! - `TestClient` - Raw line-protocol client with event buffering
//!
//! # Example
//!
//! ```rust,ignore
//! use harness::TestServer;
//!
//! #[tokio::test]
//! async fn test_matchmaking() {
//!     let server = TestServer::start().await.unwrap();
//!
//!     let mut ash = server.connect().await.unwrap();
//!     let reply = ash.join("ash").await.unwrap();
//!     assert_eq!(reply["data"]["status"], "WAITING_OPPONENT");
//! }
//! ```

mod server;

#[allow(unused_imports)]
pub use client::TestClient;
pub use server::{TestServer, ADMIN_PASSWORD, ADMIN_USERNAME};
