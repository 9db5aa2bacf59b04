//! Credential service
//!
//! The battle server consults credentials only on the `UserService`
//! login path; matchmaking itself is keyed by username.

pub mod accounts;

use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

pub use accounts::{AuthError, MemoryCredentials};

/// Usernames: 1-20 letters, digits, `_` or `-`
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,20}$").expect("valid username regex"));

/// Credential lookups consumed by the server
pub trait CredentialService: Send + Sync {
    /// Check a username/password pair
    fn authenticate(&self, username: &str, password: &str) -> bool;

    /// Whether the user has admin rights
    fn is_admin(&self, username: &str) -> bool;
}

/// Check username syntax
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Generate a random salt for password hashing
pub fn generate_salt() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    hex::encode(random_bytes)
}

/// Hash a password with a salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    hash_password(password, salt) == hash
}
