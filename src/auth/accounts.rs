//! In-memory account store
//!
//! Holds salted password hashes and admin flags. Accounts live for the
//! lifetime of the process.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use super::{generate_salt, hash_password, is_valid_username, verify_password, CredentialService};

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Authentication errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("username already exists")]
    UsernameExists,

    #[error("invalid username")]
    InvalidUsername,

    #[error("password must be at least {min} characters", min = MIN_PASSWORD_LEN)]
    PasswordTooShort,
}

#[derive(Debug, Clone)]
struct Account {
    password_hash: String,
    salt: String,
    admin: bool,
}

/// Credential service backed by a map
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account
    pub fn register(&self, username: &str, password: &str, admin: bool) -> Result<(), AuthError> {
        if !is_valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }

        let mut accounts = self.accounts.write();
        if accounts.contains_key(username) {
            return Err(AuthError::UsernameExists);
        }

        let salt = generate_salt();
        accounts.insert(
            username.to_string(),
            Account {
                password_hash: hash_password(password, &salt),
                salt,
                admin,
            },
        );
        info!(username, admin, "Registered account");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl CredentialService for MemoryCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.accounts
            .read()
            .get(username)
            .is_some_and(|a| verify_password(password, &a.salt, &a.password_hash))
    }

    fn is_admin(&self, username: &str) -> bool {
        self.accounts.read().get(username).is_some_and(|a| a.admin)
    }
}
