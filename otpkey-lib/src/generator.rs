//! The token device core: owns the single mutable record context and
//! produces one OTP per trigger.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::cipher::BlockCipher;
use crate::clock::SessionTimer;
use crate::config::TokenConfig;
use crate::error::OtpError;
use crate::otp::OTP_LEN;
use crate::record::{PUBLIC_ID_SIZE, RECORD_SIZE, SECRET_ID_SIZE, TokenRecord};
use crate::store::TokenStore;

/// OTP generator for one provisioned token.
///
/// There is exactly one of these per device; it is the only writer of
/// the counters, and the session timer is the only state shared with
/// another task (see [`SessionTimer`] for how torn reads are avoided).
pub struct TokenGenerator<S, C> {
    store: S,
    cipher: C,
    config: TokenConfig,
    public_id: [u8; PUBLIC_ID_SIZE],
    secret_id: [u8; SECRET_ID_SIZE],
    counter: u16,
    session_counter: u8,
    timer: SessionTimer,
    rng: StdRng,
}

impl<S: TokenStore, C: BlockCipher> TokenGenerator<S, C> {
    /// Boot sequence: load the key and identities, zero the session
    /// counter and timestamp, and take the mandatory counter increment
    /// so this session can never reuse a (counter, session) pair from
    /// the previous one, clean shutdown or not.
    pub fn boot(store: S, config: TokenConfig) -> Result<Self, OtpError> {
        Self::boot_inner(store, config, StdRng::from_entropy())
    }

    /// Boot with a fixed RNG seed. Deterministic output; tests and
    /// demos only.
    pub fn boot_seeded(store: S, config: TokenConfig, seed: u64) -> Result<Self, OtpError> {
        Self::boot_inner(store, config, StdRng::seed_from_u64(seed))
    }

    fn boot_inner(store: S, config: TokenConfig, rng: StdRng) -> Result<Self, OtpError> {
        let cipher = C::with_key(&store.aes_key()?);
        let public_id = store.public_id()?;
        let secret_id = store.secret_id()?;
        let counter = store.counter()?;

        let mut generator = Self {
            store,
            cipher,
            config,
            public_id,
            secret_id,
            counter,
            session_counter: 0,
            timer: SessionTimer::new(),
            rng,
        };
        generator.increment_counter();
        info!(
            public_id = %hex::encode(public_id),
            counter = generator.counter,
            "token booted"
        );
        Ok(generator)
    }

    /// Produce one fresh OTP and advance the session state.
    ///
    /// On cipher failure nothing is mutated; the next trigger retries
    /// with a fresh random draw and a freshly computed checksum, never
    /// the same failed record.
    pub fn generate(&mut self) -> Result<String, OtpError> {
        let mut record = TokenRecord {
            secret_id: self.secret_id,
            counter: self.counter,
            timestamp: self.timer.now(),
            session_counter: self.session_counter,
            random: (self.rng.next_u32() & 0xFFFF) as u16,
            crc: 0,
        };
        record.seal();

        if self.config.debug {
            trace!(record = %record, "plaintext record");
        }

        let ciphertext = self.cipher.encrypt(record.to_block())?;

        let mut output = [0u8; PUBLIC_ID_SIZE + RECORD_SIZE];
        output[..PUBLIC_ID_SIZE].copy_from_slice(&self.public_id);
        output[PUBLIC_ID_SIZE..].copy_from_slice(&ciphertext);
        let text = self.config.alphabet.encode(&output);
        debug_assert_eq!(text.len(), OTP_LEN);

        // only after a successful encode: this record is spent now
        self.increment_session_counter();
        debug!(
            counter = self.counter,
            session = self.session_counter,
            "otp emitted"
        );
        Ok(text)
    }

    /// Bump the persistent counter, mod 2^16, and persist it.
    /// Persistence is best-effort: the in-memory value stays
    /// authoritative for this session even if the write fails, the
    /// persisted value is then at worst one step behind.
    fn increment_counter(&mut self) {
        self.counter = self.counter.wrapping_add(1);
        if let Err(err) = self.store.set_counter(self.counter) {
            warn!(counter = self.counter, %err, "persistent counter write failed");
        }
    }

    /// Session bump with the 0xFF -> 0x00 escalation to the persistent
    /// counter. At most 256 emissions happen between persisted bumps,
    /// bounding the window a verifier that only tracks the persistent
    /// counter can miss.
    fn increment_session_counter(&mut self) {
        if self.session_counter == u8::MAX {
            self.session_counter = 0;
            self.increment_counter();
        } else {
            self.session_counter += 1;
        }
    }

    /// Handle for the external tick source to advance the timestamp.
    pub fn timer(&self) -> SessionTimer {
        self.timer.clone()
    }

    pub fn public_id(&self) -> [u8; PUBLIC_ID_SIZE] {
        self.public_id
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn session_counter(&self) -> u8 {
        self.session_counter
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Access the underlying store, e.g. to read back the persisted
    /// counter.
    pub fn store(&self) -> &S {
        &self.store
    }
}
