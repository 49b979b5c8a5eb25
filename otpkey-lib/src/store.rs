//! Persistent provisioning data and the non-volatile counter.
//!
//! The hardware original keeps these in EEPROM; the trait keeps the
//! generator independent of the medium and makes test doubles trivial.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cipher::KEY_SIZE;
use crate::error::OtpError;
use crate::record::{PUBLIC_ID_SIZE, SECRET_ID_SIZE};

/// Non-volatile storage contract: key, identities and the persistent
/// counter. Wear management and the storage medium are out of scope.
pub trait TokenStore {
    fn aes_key(&self) -> Result<[u8; KEY_SIZE], OtpError>;
    fn public_id(&self) -> Result<[u8; PUBLIC_ID_SIZE], OtpError>;
    fn secret_id(&self) -> Result<[u8; SECRET_ID_SIZE], OtpError>;
    fn counter(&self) -> Result<u16, OtpError>;
    fn set_counter(&mut self, value: u16) -> Result<(), OtpError>;
}

/// In-memory store for tests and demos.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub aes_key: [u8; KEY_SIZE],
    pub public_id: [u8; PUBLIC_ID_SIZE],
    pub secret_id: [u8; SECRET_ID_SIZE],
    pub counter: u16,
}

impl MemoryStore {
    pub fn new(
        aes_key: [u8; KEY_SIZE],
        public_id: [u8; PUBLIC_ID_SIZE],
        secret_id: [u8; SECRET_ID_SIZE],
        counter: u16,
    ) -> Self {
        Self {
            aes_key,
            public_id,
            secret_id,
            counter,
        }
    }
}

impl TokenStore for MemoryStore {
    fn aes_key(&self) -> Result<[u8; KEY_SIZE], OtpError> {
        Ok(self.aes_key)
    }

    fn public_id(&self) -> Result<[u8; PUBLIC_ID_SIZE], OtpError> {
        Ok(self.public_id)
    }

    fn secret_id(&self) -> Result<[u8; SECRET_ID_SIZE], OtpError> {
        Ok(self.secret_id)
    }

    fn counter(&self) -> Result<u16, OtpError> {
        Ok(self.counter)
    }

    fn set_counter(&mut self, value: u16) -> Result<(), OtpError> {
        self.counter = value;
        Ok(())
    }
}

/// Serialized provisioning state; byte fields are hex strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenState {
    pub aes_key: String,
    pub public_id: String,
    pub secret_id: String,
    pub counter: u16,
}

impl TokenState {
    /// Draw a fresh key and identities for a new token.
    pub fn random() -> Self {
        let aes_key: [u8; KEY_SIZE] = rand::random();
        let public_id: [u8; PUBLIC_ID_SIZE] = rand::random();
        let secret_id: [u8; SECRET_ID_SIZE] = rand::random();
        TokenState {
            aes_key: hex::encode(aes_key),
            public_id: hex::encode(public_id),
            secret_id: hex::encode(secret_id),
            counter: 0,
        }
    }
}

/// File-backed store: a JSON state file holding [`TokenState`]. The
/// counter is written back on every change, matching the EEPROM
/// write-on-increment behavior of the original.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    state: TokenState,
}

impl JsonStore {
    /// Write a fresh state file. Fails if the content is not valid
    /// JSON-serializable (it always is) or the file cannot be written.
    pub fn create(path: impl AsRef<Path>, state: TokenState) -> Result<Self, OtpError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            state,
        };
        store.persist()?;
        Ok(store)
    }

    /// Load an existing state file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OtpError> {
        let content = fs::read_to_string(path.as_ref())?;
        let state: TokenState = serde_json::from_str(&content)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            state,
        })
    }

    pub fn state(&self) -> &TokenState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), OtpError> {
        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "token state written");
        Ok(())
    }

    fn bytes_field<const N: usize>(field: &str, name: &str) -> Result<[u8; N], OtpError> {
        let bytes = hex::decode(field)
            .map_err(|err| OtpError::Store(format!("bad hex in {name}: {err}")))?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| OtpError::Store(format!("{name} must be {N} bytes")))
    }
}

impl TokenStore for JsonStore {
    fn aes_key(&self) -> Result<[u8; KEY_SIZE], OtpError> {
        Self::bytes_field(&self.state.aes_key, "aes_key")
    }

    fn public_id(&self) -> Result<[u8; PUBLIC_ID_SIZE], OtpError> {
        Self::bytes_field(&self.state.public_id, "public_id")
    }

    fn secret_id(&self) -> Result<[u8; SECRET_ID_SIZE], OtpError> {
        Self::bytes_field(&self.state.secret_id, "secret_id")
    }

    fn counter(&self) -> Result<u16, OtpError> {
        Ok(self.state.counter)
    }

    fn set_counter(&mut self, value: u16) -> Result<(), OtpError> {
        self.state.counter = value;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_state_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("otpkey-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_json_store_roundtrip() {
        let path = temp_state_path("roundtrip");
        let state = TokenState::random();
        let expected_key = state.aes_key.clone();

        let mut store = JsonStore::create(&path, state).unwrap();
        store.set_counter(42).unwrap();

        let reloaded = JsonStore::load(&path).unwrap();
        assert_eq!(reloaded.counter().unwrap(), 42);
        assert_eq!(hex::encode(reloaded.aes_key().unwrap()), expected_key);
        assert_eq!(reloaded.public_id().unwrap(), store.public_id().unwrap());
        assert_eq!(reloaded.secret_id().unwrap(), store.secret_id().unwrap());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_json_store_rejects_bad_field() {
        let path = temp_state_path("badfield");
        let mut state = TokenState::random();
        state.aes_key = "not-hex".to_string();
        let store = JsonStore::create(&path, state).unwrap();
        assert!(matches!(store.aes_key(), Err(OtpError::Store(_))));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_random_state_sizes() {
        let state = TokenState::random();
        assert_eq!(state.aes_key.len(), 2 * KEY_SIZE);
        assert_eq!(state.public_id.len(), 2 * PUBLIC_ID_SIZE);
        assert_eq!(state.secret_id.len(), 2 * SECRET_ID_SIZE);
        assert_eq!(state.counter, 0);
    }
}
