//! # sm3drbg-core
//!
//! **An SM3 Hash_DRBG seeded from your machine's own telemetry.**
//!
//! `sm3drbg-core` implements the SM3 hash (GB/T 32905-2016) from scratch,
//! a Hash_DRBG over it with a 440-bit state, and an entropy pool that folds
//! health-tested system counters into a 512-byte buffer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sm3drbg_core::{DrbgConfig, Sm3Drbg};
//!
//! // Self-test, power-on health test, pool creation and instantiation.
//! let mut drbg = Sm3Drbg::init(DrbgConfig::default(), b"my-app").unwrap();
//!
//! // 256 bits at a time.
//! let block = drbg.generate(256, b"").unwrap();
//! assert_eq!(block.len(), 32);
//!
//! // Or any length, one generate per 32 bytes.
//! let mut key = [0u8; 64];
//! drbg.fill_bytes(&mut key, b"session-42").unwrap();
//! ```
//!
//! ## Architecture
//!
//! Sources → Health tests → Pool (fold) → DRBG (derive) → Output
//!
//! - Seven [`TelemetrySource`]s produce a 56-byte refresh: timestamp, CPU,
//!   memory, disk and network counters, a software PRNG and the OS RNG.
//! - Every refresh passes the repetition-count test before the
//!   [`OperatingMode`] picks which 4-byte chunks are folded into the
//!   [`EntropyPool`].
//! - [`Sm3Drbg`] draws the pool on instantiate and on every reseed, and
//!   reseeds on its own after 1024 calls or 60 seconds.
//!
//! Every failure is an error value. A failed self-test, a stuck source or
//! an entropy shortfall past the retry budget stops the generator instead of
//! weakening it.

pub mod analysis;
pub mod config;
pub mod derivation;
pub mod drbg;
pub mod error;
pub mod health;
pub mod nonce;
pub mod pool;
pub mod sample;
pub mod selftest;
pub mod sm3;
pub mod source;
pub mod sources;

pub use analysis::{
    DEFAULT_ESTIMATE_BITS, MarkovModel, SourceEstimate, bits_string, estimate_all,
    estimate_source, markov_min_entropy, markov_model,
};
pub use config::DrbgConfig;
pub use derivation::{DerivationVariant, derive};
pub use drbg::{Clock, MAX_OUTPUT_BITS, SEED_LEN, Sm3Drbg, SystemClock, WorkingState};
pub use error::{DrbgError, Result};
pub use health::{HealthHistory, RepetitionTest};
pub use nonce::{NonceGenerator, NoncePadding};
pub use pool::{EntropyInput, EntropyPool, OperatingMode, POOL_CAPACITY, PoolBuffer, PoolRead};
pub use sample::{DEFAULT_SAMPLE_BITS, write_sample_file, write_samples};
pub use selftest::known_answer_test;
pub use sm3::{Sm3, sm3};
pub use source::{Platform, SourceCategory, SourceInfo, SourceKind, TelemetrySource};
pub use sources::{REFRESH_SIZE, SourceSet};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
