use std::fmt;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::crc::crc16;

/// Size of the packed token record; exactly one cipher block.
pub const RECORD_SIZE: usize = 16;

/// Bytes covered by the crc field (every field before it).
pub const CRC_SPAN: usize = 14;

/// Size of the unencrypted public identifier prefixed to the output.
pub const PUBLIC_ID_SIZE: usize = 6;

/// Size of the secret identifier embedded in the encrypted record.
pub const SECRET_ID_SIZE: usize = 6;

/// The free-running timestamp is 24 bits wide.
pub const TIMESTAMP_MASK: u32 = 0x00FF_FFFF;

/// Packed wire layout of the token record.
///
/// The 24-bit timestamp is packed low 16 bits first, high byte at
/// offset 10. This is the wire contract; the high-16/low-8 packing
/// seen in older firmware is not supported.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct TokenRecordRaw {
    pub secret_id: [u8; SECRET_ID_SIZE],
    pub counter: U16,
    pub timestamp_low: U16,
    pub timestamp_high: u8,
    pub session_counter: u8,
    pub random: U16,
    pub crc: U16,
}

/// Host-friendly view of the token record.
///
/// Holds the three freshness counters, the per-emission random value
/// and the integrity checksum. The generator owns the single live
/// instance; everything here is plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord {
    /// Static per-device secret identifier, set at provisioning.
    pub secret_id: [u8; SECRET_ID_SIZE],
    /// Persistent counter, monotonically non-decreasing across power
    /// cycles.
    pub counter: u16,
    /// Free-running 24-bit session timestamp; not an absolute clock.
    pub timestamp: u32,
    /// Volatile per-boot emission counter.
    pub session_counter: u8,
    /// Fresh random value drawn immediately before each emission.
    pub random: u16,
    /// CRC-16 over the first 14 bytes of the packed record.
    pub crc: u16,
}

impl From<TokenRecordRaw> for TokenRecord {
    fn from(raw: TokenRecordRaw) -> Self {
        TokenRecord {
            secret_id: raw.secret_id,
            counter: raw.counter.get(),
            timestamp: u32::from(raw.timestamp_low.get()) | (u32::from(raw.timestamp_high) << 16),
            session_counter: raw.session_counter,
            random: raw.random.get(),
            crc: raw.crc.get(),
        }
    }
}

impl From<TokenRecord> for TokenRecordRaw {
    fn from(record: TokenRecord) -> Self {
        TokenRecordRaw {
            secret_id: record.secret_id,
            counter: U16::new(record.counter),
            timestamp_low: U16::new((record.timestamp & 0xFFFF) as u16),
            timestamp_high: ((record.timestamp >> 16) & 0xFF) as u8,
            session_counter: record.session_counter,
            random: U16::new(record.random),
            crc: U16::new(record.crc),
        }
    }
}

impl TokenRecord {
    /// Pack into a single cipher block.
    pub fn to_block(&self) -> [u8; RECORD_SIZE] {
        let raw = TokenRecordRaw::from(*self);
        let mut block = [0u8; RECORD_SIZE];
        block.copy_from_slice(raw.as_bytes());
        block
    }

    /// Recompute the crc over the first 14 packed bytes. Called
    /// immediately before every encryption; a checksum is never reused
    /// across emissions.
    pub fn seal(&mut self) {
        let block = self.to_block();
        self.crc = crc16(&block[..CRC_SPAN]);
    }

    /// Check the stored crc against the packed fields.
    pub fn crc_ok(&self) -> bool {
        let block = self.to_block();
        self.crc == crc16(&block[..CRC_SPAN])
    }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "secret_id: {}, counter: {}, timestamp: {:#08x}, session: {}, random: {:#06x}, crc: {:#06x}",
            hex::encode(self.secret_id),
            self.counter,
            self.timestamp,
            self.session_counter,
            self.random,
            self.crc
        )
    }
}
