//! Persistent string key/value storage for session credentials.
//!
//! Mirrors the browser's local storage: flat string keys mapped to string
//! values. The session store is the only writer.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "auth_token";
/// Key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key holding the session expiry as epoch milliseconds.
pub const SESSION_EXPIRY_KEY: &str = "session_expiry";
/// Key holding the serialized current user.
pub const USER_KEY: &str = "user_data";

/// All keys that carry credentials. Cleared together on logout and on 401.
pub const CREDENTIAL_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    SESSION_EXPIRY_KEY,
    USER_KEY,
];

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes several keys. Stops at the first failure.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}
