//! CRC-16 used as the integrity field inside the encrypted token record.
//!
//! Reflected polynomial 0x8408, initial value 0xFFFF, no final xor.
//! These parameters are a compatibility contract with the verifying
//! server and must not change.

const POLY: u16 = 0x8408;

/// Compute the CRC-16 of an arbitrary byte span.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            let lsb = crc & 1;
            crc >>= 1;
            if lsb != 0 {
                crc ^= POLY;
            }
        }
    }
    crc
}
