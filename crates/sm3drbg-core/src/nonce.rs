//! Instantiation nonce.
//!
//! Layout: `boot_time(4) || subsec_nanos(4) || counter(4) || padding(64)`.
//! The first twelve bytes are the time-variant part. The padding is either a
//! fresh OS-RNG draw or the fixed blob carried by the known-answer fixture.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{DrbgError, Result};
use crate::sources::clock::boot_time;

/// Bytes contributed by the clock and the counter.
pub const NONCE_HEADER_SIZE: usize = 12;

/// Bytes of padding after the header.
pub const NONCE_PADDING_SIZE: usize = 64;

/// Total nonce length.
pub const NONCE_SIZE: usize = NONCE_HEADER_SIZE + NONCE_PADDING_SIZE;

/// Fixed padding blob.
pub const CONSTANT_PADDING: [u8; NONCE_PADDING_SIZE] = [
    0x33, 0x10, 0x51, 0xe4, 0x2b, 0xe3, 0xc2, 0x13, 0x9b, 0x40, 0x77, 0x72, 0x87, 0x85, 0xff, 0x25,
    0x53, 0xd1, 0xd7, 0xff, 0xc7, 0xc9, 0x83, 0x77, 0x87, 0x55, 0x81, 0x83, 0x7e, 0xe6, 0xa9, 0x95,
    0x01, 0xbd, 0x28, 0xa1, 0x2c, 0x49, 0x1e, 0xa6, 0x56, 0xe5, 0x66, 0x62, 0x86, 0xfd, 0xab, 0xc5,
    0x6b, 0xb0, 0x5d, 0x81, 0x15, 0x96, 0xe9, 0x66, 0x7b, 0x16, 0x53, 0x67, 0xc7, 0xd2, 0xe4, 0xc8,
];

/// Where the 64 padding bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoncePadding {
    /// [`CONSTANT_PADDING`].
    Constant,
    /// A new `getrandom` draw per nonce.
    #[default]
    Fresh,
}

/// Builds nonces for one generator instance.
#[derive(Debug)]
pub struct NonceGenerator {
    padding: NoncePadding,
    counter: u32,
    boot_time: u64,
}

impl NonceGenerator {
    pub fn new(padding: NoncePadding) -> Self {
        Self::with_boot_time(padding, boot_time())
    }

    /// Use a known boot time instead of reading it from the system.
    pub fn with_boot_time(padding: NoncePadding, boot_time: u64) -> Self {
        Self {
            padding,
            counter: 0,
            boot_time,
        }
    }

    /// Next nonce. The counter advances on every call.
    pub fn next_nonce(&mut self) -> Result<[u8; NONCE_SIZE]> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        self.counter = self.counter.wrapping_add(1);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[0..4].copy_from_slice(&(self.boot_time as u32).to_be_bytes());
        nonce[4..8].copy_from_slice(&nanos.to_be_bytes());
        nonce[8..12].copy_from_slice(&self.counter.to_be_bytes());

        let padding = &mut nonce[NONCE_HEADER_SIZE..];
        match self.padding {
            NoncePadding::Constant => padding.copy_from_slice(&CONSTANT_PADDING),
            NoncePadding::Fresh => getrandom::fill(padding).map_err(|e| {
                DrbgError::Io(std::io::Error::other(format!("nonce padding: {e}")))
            })?,
        }
        Ok(nonce)
    }

    /// Nonces issued so far.
    pub fn counter(&self) -> u32 {
        self.counter
    }
}
