pub mod cipher;
pub mod clock;
pub mod config;
pub mod crc;
pub mod encode;
pub mod error;
pub mod generator;
pub mod otp;
pub mod record;
pub mod store;


// Re-export the core types for easy access
pub use cipher::{Aes128Cipher, BlockCipher};
pub use clock::SessionTimer;
pub use config::TokenConfig;
pub use encode::Alphabet;
pub use error::OtpError;
pub use generator::TokenGenerator;
pub use otp::Otp;
pub use record::TokenRecord;
pub use store::{JsonStore, MemoryStore, TokenState, TokenStore};
