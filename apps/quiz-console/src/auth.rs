//! Account creation and sign-in.

use crate::db::{Database, DbResult};
use crate::models::User;
use rand::RngCore;
use ring::digest;

const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Created,
    UsernameTaken,
    /// Rejected before touching storage.
    Invalid(&'static str),
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(salt.as_bytes());
    ctx.update(password.as_bytes());
    hex::encode(ctx.finish())
}

fn new_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Register a new account.
pub fn create_account(db: &Database, username: &str, password: &str, is_admin: bool) -> DbResult<AccountOutcome> {
    let username = username.trim();
    if username.is_empty() {
        return Ok(AccountOutcome::Invalid("Username cannot be empty"));
    }
    if password.is_empty() {
        return Ok(AccountOutcome::Invalid("Password cannot be empty"));
    }

    let salt = new_salt();
    let hash = hash_password(&salt, password);
    if db.insert_user(username, &hash, &salt, is_admin)? {
        tracing::info!(username, is_admin, "account created");
        Ok(AccountOutcome::Created)
    } else {
        tracing::info!(username, "username already exists");
        Ok(AccountOutcome::UsernameTaken)
    }
}

/// `Some(user)` when the credentials match a stored account.
pub fn sign_in(db: &Database, username: &str, password: &str) -> DbResult<Option<User>> {
    let Some(stored) = db.find_credentials(username.trim())? else {
        tracing::info!(username, "sign-in for unknown user");
        return Ok(None);
    };

    if hash_password(&stored.salt, password) == stored.password_hash {
        tracing::info!(username = %stored.user.username, "signed in");
        Ok(Some(stored.user))
    } else {
        tracing::info!(username, "wrong password");
        Ok(None)
    }
}
