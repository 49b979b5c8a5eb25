//! Block-cipher seam between the generator and the crypto primitive.
//!
//! The block size matches the token record exactly, so sealing a
//! record is a single-block operation. Encryption failure is surfaced
//! as a `Result` so the generator can abort a trigger without burning
//! any counter state.

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::error::OtpError;
use crate::record::RECORD_SIZE;

/// Size of the symmetric key shared with the verifier.
pub const KEY_SIZE: usize = 16;

/// One-block symmetric cipher used to seal the token record.
pub trait BlockCipher {
    /// Key the cipher with the provisioned secret.
    fn with_key(key: &[u8; KEY_SIZE]) -> Self
    where
        Self: Sized;

    /// Encrypt a single record-sized block.
    fn encrypt(&self, block: [u8; RECORD_SIZE]) -> Result<[u8; RECORD_SIZE], OtpError>;
}

/// AES-128 over a single 16-byte block (ECB by construction: one
/// record is exactly one block).
pub struct Aes128Cipher {
    cipher: Aes128,
}

impl Aes128Cipher {
    /// Decrypt a single block; used by the inspect/decode path.
    pub fn decrypt_block(&self, block: [u8; RECORD_SIZE]) -> [u8; RECORD_SIZE] {
        let mut output = block;
        self.cipher.decrypt_block((&mut output).into());
        output
    }
}

impl BlockCipher for Aes128Cipher {
    fn with_key(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(key.into()),
        }
    }

    fn encrypt(&self, block: [u8; RECORD_SIZE]) -> Result<[u8; RECORD_SIZE], OtpError> {
        let mut output = block;
        self.cipher.encrypt_block((&mut output).into());
        Ok(output)
    }
}
