//! The decoder half of the wire contract: split an emitted OTP string
//! back into its parts and, given the key, recover the plaintext
//! record. Device-side debug facility; server-side counter tracking
//! lives with the verifier.

use bytes::Bytes;
use zerocopy::FromBytes;

use crate::cipher::{Aes128Cipher, BlockCipher, KEY_SIZE};
use crate::crc::crc16;
use crate::encode::Alphabet;
use crate::error::OtpError;
use crate::record::{CRC_SPAN, PUBLIC_ID_SIZE, RECORD_SIZE, TokenRecord, TokenRecordRaw};

/// Fixed length of an encoded OTP: 2 characters per byte over
/// publicId (6) || ciphertext (16).
pub const OTP_LEN: usize = 2 * (PUBLIC_ID_SIZE + RECORD_SIZE);

/// A parsed OTP: public identifier plus the still-encrypted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp {
    pub public_id: [u8; PUBLIC_ID_SIZE],
    pub ciphertext: [u8; RECORD_SIZE],
}

impl Otp {
    /// Split a 44-character OTP string into its public-id prefix and
    /// encrypted record.
    pub fn parse(text: &str, alphabet: Alphabet) -> Result<Self, OtpError> {
        if text.len() != OTP_LEN {
            return Err(OtpError::UnexpectedLength {
                expected: OTP_LEN,
                actual: text.len(),
            });
        }
        let mut bytes = Bytes::from(alphabet.decode(text)?);
        let public_id: [u8; PUBLIC_ID_SIZE] = bytes.split_to(PUBLIC_ID_SIZE).as_ref().try_into()?;
        let ciphertext: [u8; RECORD_SIZE] = bytes.as_ref().try_into()?;
        Ok(Otp {
            public_id,
            ciphertext,
        })
    }

    /// Decrypt the record with the provisioned key and validate its
    /// checksum.
    pub fn open(&self, key: &[u8; KEY_SIZE]) -> Result<TokenRecord, OtpError> {
        let cipher = Aes128Cipher::with_key(key);
        let block = cipher.decrypt_block(self.ciphertext);
        let raw = TokenRecordRaw::ref_from_bytes(&block).map_err(|_| OtpError::InvalidLength)?;
        let record = TokenRecord::from(*raw);

        let expected = crc16(&block[..CRC_SPAN]);
        if record.crc != expected {
            return Err(OtpError::CrcMismatch {
                expected,
                actual: record.crc,
            });
        }
        Ok(record)
    }

    /// Re-render with the given alphabet.
    pub fn encode(&self, alphabet: Alphabet) -> String {
        let mut bytes = [0u8; PUBLIC_ID_SIZE + RECORD_SIZE];
        bytes[..PUBLIC_ID_SIZE].copy_from_slice(&self.public_id);
        bytes[PUBLIC_ID_SIZE..].copy_from_slice(&self.ciphertext);
        alphabet.encode(&bytes)
    }
}
