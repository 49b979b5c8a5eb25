use serde::{Deserialize, Serialize};

use crate::encode::Alphabet;

/// Runtime options for a token device. These were compile-time feature
/// flags in the firmware original; here they are plain configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Dump the plaintext record fields at trace level before each
    /// encryption. Has no effect on the generated output.
    pub debug: bool,
    /// Deliver OTPs as bare keystroke lines instead of log records.
    /// Honored by the transport, not the generation core.
    pub emit_keystrokes: bool,
    /// Output alphabet; part of the wire contract with the verifier.
    pub alphabet: Alphabet,
}
