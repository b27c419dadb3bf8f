//! Known-answer self-test.
//!
//! Instantiates a working state from a fixed entropy input and nonce, with
//! no personalization. It then generates 256 bits and compares them with
//! the expected block for the configured derivation variant.

use log::{error, info};

use crate::derivation::DerivationVariant;
use crate::drbg::{MAX_OUTPUT_BITS, WorkingState};
use crate::error::{DrbgError, Result};
use crate::nonce::{CONSTANT_PADDING, NONCE_HEADER_SIZE, NONCE_SIZE};

/// Entropy input: bytes `0x00` through `0x36`.
pub const KAT_ENTROPY: [u8; 55] = {
    let mut out = [0u8; 55];
    let mut i = 0;
    while i < out.len() {
        out[i] = i as u8;
        i += 1;
    }
    out
};

const KAT_NONCE_HEADER: [u8; NONCE_HEADER_SIZE] = [
    0x01, 0x23, 0x45, 0x67, 0x01, 0x23, 0x45, 0x67, 0x00, 0x00, 0x00, 0x01,
];

/// Nonce: a fixed header followed by the constant padding.
pub const KAT_NONCE: [u8; NONCE_SIZE] = {
    let mut out = [0u8; NONCE_SIZE];
    let mut i = 0;
    while i < NONCE_SIZE {
        out[i] = if i < NONCE_HEADER_SIZE {
            KAT_NONCE_HEADER[i]
        } else {
            CONSTANT_PADDING[i - NONCE_HEADER_SIZE]
        };
        i += 1;
    }
    out
};

const EXPECTED_ACCUMULATING: [u8; 32] = [
    0x10, 0x42, 0xb1, 0xd2, 0xb2, 0x53, 0x0e, 0x1e, 0xbc, 0x10, 0x37, 0x54, 0x10, 0x4a, 0x98, 0xcf,
    0x69, 0x27, 0x12, 0xfa, 0xed, 0x7e, 0xb5, 0x55, 0xbc, 0xa0, 0x43, 0x1c, 0x16, 0x74, 0x68, 0xbf,
];

const EXPECTED_STANDARD: [u8; 32] = [
    0xc6, 0xb5, 0xb1, 0x07, 0xce, 0x23, 0x21, 0xc8, 0x8f, 0x31, 0x26, 0xef, 0x73, 0x45, 0xa9, 0x4d,
    0x5b, 0xd8, 0xef, 0x4c, 0x98, 0x1e, 0xdc, 0x32, 0x53, 0xa2, 0x5c, 0x1b, 0x42, 0x89, 0x6b, 0x57,
];

/// The block the first generate must return for `variant`.
pub fn expected_output(variant: DerivationVariant) -> &'static [u8; 32] {
    match variant {
        DerivationVariant::Accumulating => &EXPECTED_ACCUMULATING,
        DerivationVariant::Standard => &EXPECTED_STANDARD,
    }
}

/// What the implementation actually produces for the fixed inputs.
pub fn known_answer_output(variant: DerivationVariant) -> Result<Vec<u8>> {
    let mut state = WorkingState::instantiate(&KAT_ENTROPY, &KAT_NONCE, &[], variant, 0);
    state.generate(MAX_OUTPUT_BITS, &[])
}

/// Run the known-answer test. A mismatch is [`DrbgError::SelfTestFailure`].
pub fn known_answer_test(variant: DerivationVariant) -> Result<()> {
    check_known_answer(variant, expected_output(variant))
}

/// Compare the fixed-input output for `variant` against `expected`.
pub fn check_known_answer(variant: DerivationVariant, expected: &[u8]) -> Result<()> {
    let output = known_answer_output(variant)?;
    if output.as_slice() != expected {
        error!("known-answer self-test failed ({variant} derivation)");
        return Err(DrbgError::SelfTestFailure);
    }
    info!("known-answer self-test passed ({variant} derivation)");
    Ok(())
}
