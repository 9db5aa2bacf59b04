//! TestServer - True end-to-end test harness
//!
//! Spawns the actual battled binary on a random port. Rate limits are
//! relaxed unless a test asks for specific settings, so ordinary scenarios
//! can open as many connections as they like.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::Result;

use super::client::TestClient;

/// Admin account seeded into every test server
pub const ADMIN_USERNAME: &str = "oak";
pub const ADMIN_PASSWORD: &str = "professor-oak";

/// Test harness that spawns the actual battled binary on a random port
pub struct TestServer {
    pub addr: SocketAddr,
    child: Child,
}

impl TestServer {
    /// Start a server with relaxed rate limits
    pub async fn start() -> Result<Self> {
        Self::start_with_env(&[
            ("BATTLED_RATE_LIMIT__COOLDOWN_MS", "0"),
            ("BATTLED_RATE_LIMIT__MAX_REQUESTS", "100000"),
        ])
        .await
    }

    /// Start a server with extra `BATTLED_*` overrides.
    ///
    /// The readiness check opens one connection, which the rate limiter
    /// counts like any other.
    pub async fn start_with_env(env: &[(&str, &str)]) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mut command = Command::new(env!("CARGO_BIN_EXE_battled"));
        command
            .arg("--bind")
            .arg(addr.to_string())
            .env("RUST_LOG", "battled=warn")
            .env("BATTLED_ADMIN_USERNAME", ADMIN_USERNAME)
            .env("BATTLED_ADMIN_PASSWORD", ADMIN_PASSWORD)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in env {
            command.env(key, value);
        }
        let child = command
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn battled binary: {}", e))?;

        let mut server = Self { addr, child };

        // Poll until server is ready (max 5 seconds to handle resource contention)
        let mut ready = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if tokio::net::TcpStream::connect(addr).await.is_ok() {
                ready = true;
                break;
            }
        }

        if !ready {
            let _ = server.child.kill();
            panic!("Server failed to start within 5 seconds");
        }

        Ok(server)
    }

    /// Open a raw protocol connection
    pub async fn connect(&self) -> Result<TestClient> {
        TestClient::connect(self.addr).await
    }

    /// Connect two clients and match them; returns (first mover, second)
    pub async fn battle(&self, first: &str, second: &str) -> Result<(TestClient, TestClient)> {
        let mut a = self.connect().await?;
        let mut b = self.connect().await?;

        let waiting = a.join(first).await?;
        anyhow::ensure!(
            waiting["data"]["status"] == "WAITING_OPPONENT",
            "unexpected join reply: {}",
            waiting
        );
        let started = b.join(second).await?;
        anyhow::ensure!(
            started["data"]["status"] == "BATTLE_STARTED",
            "unexpected join reply: {}",
            started
        );
        a.expect_event("BATTLE_STARTED").await?;
        Ok((a, b))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
