use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::OtpError;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
const ARDUHEX_CHARS: &[u8; 16] = b"cbdefghijklnrtuv";

/// Nibble alphabet used to render OTP bytes as text.
///
/// Either variant produces exactly two characters per byte, high
/// nibble first, and is exactly reversible by [`Alphabet::decode`].
/// The choice is part of the wire contract with the verifier: it is
/// carried in configuration and never switched silently.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    /// Plain lowercase hex.
    #[strum(to_string = "hex")]
    Hex = 0,
    /// Keyboard-layout-safe nibble map. The sixteen characters sit on
    /// the same scancodes across common host layouts, so an OTP typed
    /// out as keystrokes survives layout differences.
    #[default]
    #[strum(to_string = "arduhex")]
    ArduHex = 1,
}

impl Alphabet {
    fn chars(&self) -> &'static [u8; 16] {
        match self {
            Alphabet::Hex => HEX_CHARS,
            Alphabet::ArduHex => ARDUHEX_CHARS,
        }
    }

    /// Render a byte span as text, two characters per byte.
    pub fn encode(&self, data: &[u8]) -> String {
        let chars = self.chars();
        let mut out = String::with_capacity(data.len() * 2);
        for &byte in data {
            out.push(chars[usize::from(byte >> 4)] as char);
            out.push(chars[usize::from(byte & 0x0F)] as char);
        }
        out
    }

    /// Exact inverse of [`Alphabet::encode`]. Rejects characters
    /// outside the alphabet and odd-length input.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, OtpError> {
        if text.len() % 2 != 0 {
            return Err(OtpError::InvalidLength);
        }
        let nibbles = text
            .chars()
            .map(|ch| self.nibble(ch))
            .collect::<Result<Vec<u8>, OtpError>>()?;
        Ok(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    fn nibble(&self, ch: char) -> Result<u8, OtpError> {
        self.chars()
            .iter()
            .position(|&c| c as char == ch)
            .map(|index| index as u8)
            .ok_or(OtpError::InvalidChar { ch, alphabet: *self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arduhex_known_vector() {
        assert_eq!(Alphabet::ArduHex.encode(b"test"), "ifhgieif");
        assert_eq!(Alphabet::ArduHex.decode("ifhgieif").unwrap(), b"test");
    }

    #[test]
    fn test_hex_matches_hex_crate() {
        let data = [0x00u8, 0x47, 0x2d, 0xff, 0x9a];
        assert_eq!(Alphabet::Hex.encode(&data), hex::encode(data));
    }

    #[test]
    fn test_roundtrip_22_byte_span() {
        // publicId (6) || ciphertext (16) is always 22 bytes on the wire
        let span: Vec<u8> = (0..22u8).map(|i| i.wrapping_mul(11).wrapping_add(7)).collect();
        for alphabet in [Alphabet::Hex, Alphabet::ArduHex] {
            let text = alphabet.encode(&span);
            assert_eq!(text.len(), 44);
            assert_eq!(alphabet.decode(&text).unwrap(), span);
        }
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        // 'a' is valid hex but not arduhex
        let err = Alphabet::ArduHex.decode("aa").unwrap_err();
        assert!(matches!(err, OtpError::InvalidChar { ch: 'a', .. }));

        let err = Alphabet::Hex.decode("0g").unwrap_err();
        assert!(matches!(err, OtpError::InvalidChar { ch: 'g', .. }));
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(matches!(
            Alphabet::Hex.decode("abc"),
            Err(OtpError::InvalidLength)
        ));
    }

    #[test]
    fn test_alphabet_names_and_primitives() {
        assert_eq!(Alphabet::ArduHex.to_string(), "arduhex");
        assert_eq!(Alphabet::Hex.to_string(), "hex");
        assert_eq!(Alphabet::try_from(0u8).unwrap(), Alphabet::Hex);
        assert_eq!(Alphabet::try_from(1u8).unwrap(), Alphabet::ArduHex);
        assert!(Alphabet::try_from(2u8).is_err());
        assert_eq!(u8::from(Alphabet::ArduHex), 1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Alphabet::ArduHex.encode(&[]), "");
        assert!(Alphabet::ArduHex.decode("").unwrap().is_empty());
    }
}
