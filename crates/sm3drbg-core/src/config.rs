//! Tunables for the DRBG, the pool and the health tests.
//!
//! Defaults reproduce the reference parameters. A JSON file can override
//! any subset of fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::derivation::DerivationVariant;
use crate::error::{DrbgError, Result};
use crate::nonce::NoncePadding;
use crate::pool::{OperatingMode, POOL_CAPACITY};

/// Generate calls allowed between reseeds.
pub const DEFAULT_RESEED_INTERVAL: u64 = 1024;
/// Seconds allowed between reseeds.
pub const DEFAULT_RESEED_SECONDS: u64 = 60;
/// Identical consecutive samples tolerated before a source is declared stuck.
pub const DEFAULT_REPETITION_CUTOFF: u32 = 10;
/// Samples per source during the power-on test.
pub const DEFAULT_POWER_ON_SAMPLES: usize = 1024;
/// Minimum entropy input, in bits.
pub const MIN_ENTROPY_INPUT_BITS: u64 = 256;
/// Maximum entropy input, in bits (2^35).
pub const MAX_ENTROPY_INPUT_BITS: u64 = 1 << 35;

/// DRBG configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrbgConfig {
    /// Operating mode, 0 through 3.
    pub mode: u8,
    pub reseed_interval: u64,
    pub reseed_seconds: u64,
    pub repetition_cutoff: u32,
    pub power_on_samples: usize,
    pub min_entropy_bits: u64,
    pub min_entropy_input_bits: u64,
    pub max_entropy_input_bits: u64,
    /// Entropy draws before giving up with `EntropyInsufficient`.
    pub max_entropy_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub nonce_padding: NoncePadding,
    pub derivation: DerivationVariant,
}

impl Default for DrbgConfig {
    fn default() -> Self {
        Self {
            mode: 3,
            reseed_interval: DEFAULT_RESEED_INTERVAL,
            reseed_seconds: DEFAULT_RESEED_SECONDS,
            repetition_cutoff: DEFAULT_REPETITION_CUTOFF,
            power_on_samples: DEFAULT_POWER_ON_SAMPLES,
            min_entropy_bits: MIN_ENTROPY_INPUT_BITS,
            min_entropy_input_bits: MIN_ENTROPY_INPUT_BITS,
            max_entropy_input_bits: MAX_ENTROPY_INPUT_BITS,
            max_entropy_attempts: 8,
            backoff_initial_ms: 1,
            backoff_max_ms: 250,
            nonce_padding: NoncePadding::default(),
            derivation: DerivationVariant::default(),
        }
    }
}

impl DrbgConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the generator cannot honour.
    pub fn validate(&self) -> Result<()> {
        OperatingMode::select(self.mode)?;
        if self.reseed_interval == 0 {
            return Err(DrbgError::Configuration(
                "reseed_interval must be at least 1".into(),
            ));
        }
        if self.repetition_cutoff == 0 {
            return Err(DrbgError::Configuration(
                "repetition_cutoff must be at least 1".into(),
            ));
        }
        if self.max_entropy_attempts == 0 {
            return Err(DrbgError::Configuration(
                "max_entropy_attempts must be at least 1".into(),
            ));
        }
        if self.min_entropy_input_bits > self.max_entropy_input_bits {
            return Err(DrbgError::Configuration(format!(
                "min_entropy_input_bits ({}) exceeds max_entropy_input_bits ({})",
                self.min_entropy_input_bits, self.max_entropy_input_bits
            )));
        }
        let capacity_bits = (POOL_CAPACITY * 8) as u64;
        if self.min_entropy_bits > capacity_bits {
            return Err(DrbgError::Configuration(format!(
                "min_entropy_bits ({}) exceeds pool capacity ({capacity_bits} bits)",
                self.min_entropy_bits
            )));
        }
        if self.max_entropy_input_bits < capacity_bits {
            return Err(DrbgError::Configuration(format!(
                "max_entropy_input_bits ({}) is below pool capacity ({capacity_bits} bits)",
                self.max_entropy_input_bits
            )));
        }
        if self.min_entropy_input_bits > capacity_bits {
            return Err(DrbgError::Configuration(format!(
                "min_entropy_input_bits ({}) exceeds pool capacity ({capacity_bits} bits)",
                self.min_entropy_input_bits
            )));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(DrbgError::Configuration(
                "backoff_initial_ms exceeds backoff_max_ms".into(),
            ));
        }
        Ok(())
    }

    /// Sleep before entropy attempt `attempt` (0-based): doubles up to the cap.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .backoff_initial_ms
            .saturating_mul(factor)
            .min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}
