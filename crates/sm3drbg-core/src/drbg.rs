//! SM3 Hash_DRBG.
//!
//! [`WorkingState`] holds the arithmetic: instantiate, reseed and one
//! generate step over a 440-bit `V` and `C`. It is a pure function of its
//! inputs and is what the known-answer test drives.
//!
//! [`Sm3Drbg`] wraps a working state with policy. It runs the self-test
//! before instantiating and builds the nonce. It draws entropy from an
//! [`EntropyInput`] with bounded retry, and reseeds automatically once the
//! generate counter or the clock passes its limit.

use std::time::Instant;

use log::{debug, error, info};
use zeroize::{Zeroize, Zeroizing};

use crate::config::DrbgConfig;
use crate::derivation::{DerivationVariant, derive_parts};
use crate::error::{DrbgError, Result};
use crate::nonce::NonceGenerator;
use crate::pool::{EntropyInput, EntropyPool, PoolRead};
use crate::selftest::known_answer_test;
use crate::sm3::{SM3_OUTPUT_SIZE, Sm3};
use crate::sources::SourceSet;

/// Length of `V` and `C` in bytes.
pub const SEED_LEN: usize = 55;

/// Length of `V` and `C` in bits.
pub const SEED_LEN_BITS: u32 = (SEED_LEN * 8) as u32;

/// Largest output of a single generate call, in bits.
pub const MAX_OUTPUT_BITS: usize = SM3_OUTPUT_SIZE * 8;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the reseed timestamp.
pub trait Clock: Send {
    /// Seconds on a monotonic-enough scale; only differences are used.
    fn now_secs(&self) -> u64;
}

/// Monotonic seconds since the clock was created.
///
/// Wall-clock steps (NTP, manual changes) do not move it.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

// ---------------------------------------------------------------------------
// 440-bit arithmetic
// ---------------------------------------------------------------------------

/// `v = (v + addend) mod 2^440`, with `addend` right-aligned big-endian.
fn v_add(v: &mut [u8; SEED_LEN], addend: &[u8]) {
    let offset = SEED_LEN - addend.len();
    let mut carry: u16 = 0;
    for i in (0..SEED_LEN).rev() {
        let a = if i >= offset {
            u16::from(addend[i - offset])
        } else {
            0
        };
        let sum = u16::from(v[i]) + a + carry;
        v[i] = sum as u8;
        carry = sum >> 8;
    }
}

fn v_add_u64(v: &mut [u8; SEED_LEN], val: u64) {
    v_add(v, &val.to_be_bytes());
}

// ---------------------------------------------------------------------------
// Working state
// ---------------------------------------------------------------------------

/// `V`, `C`, the reseed counter and the time of the last (re)seed.
pub struct WorkingState {
    v: [u8; SEED_LEN],
    c: [u8; SEED_LEN],
    reseed_counter: u64,
    reseed_time: u64,
    variant: DerivationVariant,
}

impl Drop for WorkingState {
    fn drop(&mut self) {
        self.v.zeroize();
        self.c.zeroize();
    }
}

impl std::fmt::Debug for WorkingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingState")
            .field("reseed_counter", &self.reseed_counter)
            .field("reseed_time", &self.reseed_time)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl WorkingState {
    /// `V = df(entropy || nonce || personalization)`, `C = df(0x00 || V)`.
    pub fn instantiate(
        entropy_input: &[u8],
        nonce: &[u8],
        personalization: &[u8],
        variant: DerivationVariant,
        now: u64,
    ) -> Self {
        let mut state = Self {
            v: [0; SEED_LEN],
            c: [0; SEED_LEN],
            reseed_counter: 1,
            reseed_time: now,
            variant,
        };
        state.reseed_from(&[entropy_input, nonce, personalization], now);
        state
    }

    /// `V = df(0x01 || entropy || V || additional)`, then `C` as on instantiate.
    pub fn reseed(&mut self, entropy_input: &[u8], additional_input: &[u8], now: u64) {
        let old_v = Zeroizing::new(self.v);
        self.reseed_from(&[&[0x01], entropy_input, &old_v[..], additional_input], now);
    }

    fn reseed_from(&mut self, seed_material: &[&[u8]], now: u64) {
        let mut seed = derive_parts(seed_material, SEED_LEN_BITS, self.variant);
        self.v.copy_from_slice(&seed);
        seed.zeroize();

        let mut c = derive_parts(&[&[0x00], &self.v], SEED_LEN_BITS, self.variant);
        self.c.copy_from_slice(&c);
        c.zeroize();

        self.reseed_counter = 1;
        self.reseed_time = now;
    }

    /// One output block without any reseed policy.
    ///
    /// Mixes in `additional_input` if non-empty, returns the first
    /// `requested_bits / 8` bytes of `SM3(V)` and advances
    /// `V = V + SM3(0x03 || V) + C + counter`.
    pub fn generate(&mut self, requested_bits: usize, additional_input: &[u8]) -> Result<Vec<u8>> {
        if requested_bits > MAX_OUTPUT_BITS {
            return Err(DrbgError::RequestTooLarge {
                requested: requested_bits,
                max: MAX_OUTPUT_BITS,
            });
        }

        if !additional_input.is_empty() {
            let mut w = Sm3::digest_parts(&[&[0x02], &self.v, additional_input]);
            v_add(&mut self.v, &w);
            w.zeroize();
        }

        let mut block = Sm3::digest(&self.v);
        let output = block[..requested_bits / 8].to_vec();
        block.zeroize();

        let mut h = Sm3::digest_parts(&[&[0x03], &self.v]);
        v_add(&mut self.v, &h);
        h.zeroize();
        v_add(&mut self.v, &self.c);
        v_add_u64(&mut self.v, self.reseed_counter);
        self.reseed_counter += 1;

        Ok(output)
    }

    /// Generate calls since the last (re)seed, plus one.
    pub fn reseed_counter(&self) -> u64 {
        self.reseed_counter
    }

    /// Clock reading at the last (re)seed.
    pub fn reseed_time(&self) -> u64 {
        self.reseed_time
    }

    pub fn variant(&self) -> DerivationVariant {
        self.variant
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Draw entropy, retrying with backoff while the input reports a shortfall.
fn draw_entropy<E: EntropyInput>(
    entropy: &mut E,
    config: &DrbgConfig,
) -> Result<Zeroizing<Vec<u8>>> {
    for attempt in 0..config.max_entropy_attempts {
        match entropy.draw(
            config.min_entropy_bits,
            config.min_entropy_input_bits,
            config.max_entropy_input_bits,
        )? {
            PoolRead::Ready(bytes) => return Ok(bytes),
            PoolRead::Insufficient { available_bits } => {
                debug!(
                    "entropy attempt {}/{}: {available_bits} bits available",
                    attempt + 1,
                    config.max_entropy_attempts
                );
                if attempt + 1 < config.max_entropy_attempts {
                    std::thread::sleep(config.backoff(attempt));
                }
            }
        }
    }
    error!(
        "entropy still insufficient after {} attempts",
        config.max_entropy_attempts
    );
    Err(DrbgError::EntropyInsufficient {
        attempts: config.max_entropy_attempts,
    })
}

/// SM3 Hash_DRBG seeded from an [`EntropyInput`].
///
/// Construction runs the known-answer self-test and fails closed on any
/// self-test, health or entropy error. There is no way to hold an
/// uninstantiated generator.
pub struct Sm3Drbg<E: EntropyInput = EntropyPool, C: Clock = SystemClock> {
    config: DrbgConfig,
    state: WorkingState,
    entropy: E,
    clock: C,
    nonces: NonceGenerator,
    reseeds: u64,
}

impl Sm3Drbg<EntropyPool, SystemClock> {
    /// Instantiate on the system telemetry sources.
    pub fn init(config: DrbgConfig, personalization: &[u8]) -> Result<Self> {
        config.validate()?;
        known_answer_test(config.derivation)?;
        let pool = EntropyPool::from_config(&config, SourceSet::system()?)?;
        let nonces = NonceGenerator::new(config.nonce_padding);
        Self::instantiate(config, pool, SystemClock::new(), nonces, personalization)
    }
}

impl<E: EntropyInput, C: Clock> Sm3Drbg<E, C> {
    /// Instantiate on a caller-provided entropy input and clock.
    pub fn with_parts(
        config: DrbgConfig,
        entropy: E,
        clock: C,
        personalization: &[u8],
    ) -> Result<Self> {
        Self::with_self_test(config, entropy, clock, personalization, known_answer_test)
    }

    /// [`with_parts`](Self::with_parts) with the self-test passed in.
    fn with_self_test(
        config: DrbgConfig,
        entropy: E,
        clock: C,
        personalization: &[u8],
        self_test: impl FnOnce(DerivationVariant) -> Result<()>,
    ) -> Result<Self> {
        config.validate()?;
        self_test(config.derivation)?;
        let nonces = NonceGenerator::new(config.nonce_padding);
        Self::instantiate(config, entropy, clock, nonces, personalization)
    }

    fn instantiate(
        config: DrbgConfig,
        mut entropy: E,
        clock: C,
        mut nonces: NonceGenerator,
        personalization: &[u8],
    ) -> Result<Self> {
        let mut nonce = nonces.next_nonce()?;
        let input = draw_entropy(&mut entropy, &config)?;
        let state = WorkingState::instantiate(
            &input,
            &nonce,
            personalization,
            config.derivation,
            clock.now_secs(),
        );
        nonce.zeroize();

        info!(
            "SM3 DRBG instantiated ({} bits of entropy input, {} derivation)",
            input.len() * 8,
            config.derivation
        );
        Ok(Self {
            config,
            state,
            entropy,
            clock,
            nonces,
            reseeds: 0,
        })
    }

    fn reseed_due(&self) -> bool {
        let elapsed = self
            .clock
            .now_secs()
            .saturating_sub(self.state.reseed_time());
        self.state.reseed_counter() > self.config.reseed_interval
            || elapsed > self.config.reseed_seconds
    }

    fn reseed(&mut self, additional_input: &[u8]) -> Result<()> {
        let input = draw_entropy(&mut self.entropy, &self.config)?;
        self.state
            .reseed(&input, additional_input, self.clock.now_secs());
        self.reseeds += 1;
        info!("SM3 DRBG reseeded (#{})", self.reseeds);
        Ok(())
    }

    /// Up to 256 bits of output.
    ///
    /// Reseeds first when more than `reseed_interval` calls or more than
    /// `reseed_seconds` have passed since the last seed. The additional input
    /// goes into that reseed and into the output step.
    pub fn generate(&mut self, requested_bits: usize, additional_input: &[u8]) -> Result<Vec<u8>> {
        if requested_bits > MAX_OUTPUT_BITS {
            return Err(DrbgError::RequestTooLarge {
                requested: requested_bits,
                max: MAX_OUTPUT_BITS,
            });
        }
        if self.reseed_due() {
            self.reseed(additional_input)?;
        }
        self.state.generate(requested_bits, additional_input)
    }

    /// 256 bits of output as a string of `'0'` and `'1'`.
    pub fn generate_bits(&mut self, additional_input: &[u8]) -> Result<String> {
        let bytes = self.generate(MAX_OUTPUT_BITS, additional_input)?;
        Ok(crate::analysis::bits_string(&bytes))
    }

    /// Fill `out` with one full generate call per 32-byte block.
    pub fn fill_bytes(&mut self, out: &mut [u8], additional_input: &[u8]) -> Result<()> {
        for chunk in out.chunks_mut(SM3_OUTPUT_SIZE) {
            let mut block = self.generate(MAX_OUTPUT_BITS, additional_input)?;
            chunk.copy_from_slice(&block[..chunk.len()]);
            block.zeroize();
        }
        Ok(())
    }

    pub fn config(&self) -> &DrbgConfig {
        &self.config
    }

    pub fn reseed_counter(&self) -> u64 {
        self.state.reseed_counter()
    }

    pub fn last_reseed_time(&self) -> u64 {
        self.state.reseed_time()
    }

    /// Automatic reseeds since instantiation.
    pub fn reseeds(&self) -> u64 {
        self.reseeds
    }

    /// Nonces issued by this instance.
    pub fn nonces_issued(&self) -> u32 {
        self.nonces.counter()
    }

    pub fn entropy(&self) -> &E {
        &self.entropy
    }
}
