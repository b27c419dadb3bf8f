//! Error values for every fail-closed path in the generator.
//!
//! Nothing in this crate logs a failure and carries on: self-test
//! mismatches, stuck sources, entropy shortfalls and bad configuration all
//! surface here and the caller gets no output.

use crate::source::SourceKind;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DrbgError>;

/// Errors returned by the DRBG, the entropy pool and their collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DrbgError {
    /// The known-answer test produced the wrong output.
    #[error("known-answer self-test failed")]
    SelfTestFailure,

    /// The pool never reached the requested minimum within the retry budget.
    #[error("entropy pool below requested minimum after {attempts} attempts")]
    EntropyInsufficient { attempts: u32 },

    /// The requested entropy bounds conflict with each other or with the pool.
    #[error(
        "invalid entropy bounds: min_entropy={min_entropy} min_bits={min_bits} max_bits={max_bits}"
    )]
    EntropyBoundsInvalid {
        min_entropy: u64,
        min_bits: u64,
        max_bits: u64,
    },

    /// A source repeated the same sample more often than the cutoff allows.
    #[error("repetition count test failed for {kind}: {repeats} identical samples")]
    HealthTestFailure { kind: SourceKind, repeats: u32 },

    /// Invalid operating mode or inconsistent configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single generate call asked for more than one hash block.
    #[error("requested {requested} bits, at most {max} bits per generate call")]
    RequestTooLarge { requested: usize, max: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file: {0}")]
    Config(#[from] serde_json::Error),
}
