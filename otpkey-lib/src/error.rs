use std::array::TryFromSliceError;
use std::io;
use thiserror::Error;

use crate::encode::Alphabet;

/// The primary error type for the `otpkey` library.
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("encryption failed: {0}")]
    EncryptFailed(String),

    #[error("token store error: {0}")]
    Store(String),

    #[error("invalid length")]
    InvalidLength,

    #[error("unexpected length: expected {expected}, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("character {ch:?} is not in the {alphabet} alphabet")]
    InvalidChar { ch: char, alphabet: Alphabet },

    #[error("record checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("state file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TryFromSliceError> for OtpError {
    fn from(_: TryFromSliceError) -> Self {
        OtpError::InvalidLength
    }
}
