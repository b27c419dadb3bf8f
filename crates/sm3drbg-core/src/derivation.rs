//! SM3 derivation function.
//!
//! Counter-mode hashing that stretches or compresses arbitrary input to an
//! exact bit length. Each block is
//! `SM3(counter(1) || requested_bits(4, big-endian) || input)` with the
//! counter starting at 1.
//!
//! Two ways of chaining the blocks exist in the wild and both are kept:
//!
//! - [`DerivationVariant::Standard`]: `T = T || block` (SP 800-90A Hash_df).
//! - [`DerivationVariant::Accumulating`]: `T = T || T || block`. This is the
//!   chaining that produced the published SM3-DRBG known answer, so it is the
//!   default. For 440 bits it yields `block1 || block1[..23]`.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::sm3::{SM3_OUTPUT_SIZE, Sm3};

/// How successive derivation blocks are chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationVariant {
    /// Running buffer is repeated before every new block.
    #[default]
    Accumulating,
    /// Plain block concatenation.
    Standard,
}

impl std::fmt::Display for DerivationVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accumulating => write!(f, "accumulating"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Derive exactly `requested_bits / 8` bytes from `input`.
pub fn derive(input: &[u8], requested_bits: u32, variant: DerivationVariant) -> Vec<u8> {
    derive_parts(&[input], requested_bits, variant)
}

/// Same as [`derive`] over the concatenation of `parts`, without building it.
pub fn derive_parts(parts: &[&[u8]], requested_bits: u32, variant: DerivationVariant) -> Vec<u8> {
    let output_len = (requested_bits / 8) as usize;
    let bits = requested_bits.to_be_bytes();
    let mut temp = Vec::with_capacity(output_len + SM3_OUTPUT_SIZE);
    let mut counter: u8 = 1;

    while temp.len() < output_len {
        let mut ctx = Sm3::new();
        ctx.update(&[counter]);
        ctx.update(&bits);
        for part in parts {
            ctx.update(part);
        }
        let mut block = ctx.finalize();

        if variant == DerivationVariant::Accumulating {
            temp.extend_from_within(..);
        }
        temp.extend_from_slice(&block);
        block.zeroize();
        counter = counter.wrapping_add(1);
    }

    if temp.len() > output_len {
        temp[output_len..].zeroize();
    }
    temp.truncate(output_len);
    temp
}
