//! Entropy pool: folds health-tested telemetry into a 512-byte buffer.
//!
//! The pool is created once per generator. Creation runs the power-on
//! health test and one update. Every later update takes a fresh 56-byte
//! refresh from the [`SourceSet`], runs the continuous test on it, and folds
//! the 4-byte chunks chosen by the [`OperatingMode`] into the buffer.
//!
//! The pool models accumulated entropy. Reads never drain it, and its
//! length only grows until it saturates at [`POOL_CAPACITY`].

use log::{debug, error, info};
use zeroize::{Zeroize, Zeroizing};

use crate::config::DrbgConfig;
use crate::error::{DrbgError, Result};
use crate::health::HealthHistory;
use crate::sources::{REFRESH_SIZE, SourceSet};

/// Pool size in bytes.
pub const POOL_CAPACITY: usize = 512;

/// Number of 4-byte slots in the pool.
const SLOTS: usize = POOL_CAPACITY / 4;

/// Slot offsets XORed into each new slot value, relative to the slot index.
const TAP_OFFSETS: [usize; 6] = [0, 1, 25, 51, 76, 103];

/// Reduction table indexed by the low 3 bits of the last pre-shift byte.
const TWIST_TABLE: [u32; 8] = [
    0x0000_0000,
    0x3b6e_20c8,
    0x76dc_4190,
    0x4db2_6158,
    0xedb8_8320,
    0xd6d6_a3e8,
    0x9b64_c2b0,
    0xa00a_e278,
];

/// Chunks of the 56-byte refresh folded per update, one row per mode.
const FOLD_SETS: [&[usize]; 4] = [
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
];

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// Which refresh chunks reach the pool.
///
/// Modes 0 and 1 leave out the generator samples (chunks 12 and 13) in part
/// or in full; mode 2 keeps the hardware RNG but drops the software PRNG;
/// mode 3 folds everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingMode {
    id: u8,
}

impl OperatingMode {
    /// Validate a mode number.
    pub fn select(id: u8) -> Result<Self> {
        if usize::from(id) >= FOLD_SETS.len() {
            error!("invalid operating mode {id}, expected 0-3");
            return Err(DrbgError::Configuration(format!(
                "operating mode must be 0-3, got {id}"
            )));
        }
        Ok(Self { id })
    }

    pub fn id(self) -> u8 {
        self.id
    }

    /// Indices of the refresh chunks folded in this mode.
    pub fn chunks(self) -> &'static [usize] {
        FOLD_SETS[usize::from(self.id)]
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mode {} ({} chunks)", self.id, self.chunks().len())
    }
}

// ---------------------------------------------------------------------------
// Pool buffer
// ---------------------------------------------------------------------------

/// Outcome of a successful bounds check on [`PoolBuffer::read`].
#[derive(Debug)]
pub enum PoolRead {
    /// The accumulated pool content.
    Ready(Zeroizing<Vec<u8>>),
    /// Accumulated length is below the requested minimum; retry later.
    Insufficient { available_bits: u64 },
}

/// The 512-byte mixing buffer and its saturating length.
pub struct PoolBuffer {
    content: [u8; POOL_CAPACITY],
    length: usize,
}

impl Default for PoolBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        self.content.zeroize();
    }
}

impl PoolBuffer {
    /// An all-zero, empty pool.
    pub fn new() -> Self {
        Self {
            content: [0; POOL_CAPACITY],
            length: 0,
        }
    }

    /// Mix one 4-byte chunk into every slot of the pool.
    ///
    /// Slots are rewritten in order, so later slots see the already-updated
    /// values of earlier ones.
    pub fn fold(&mut self, chunk: [u8; 4]) {
        for i in 0..SLOTS {
            let mut t = chunk;
            for off in TAP_OFFSETS {
                let at = ((i + off) % SLOTS) * 4;
                for (b, p) in t.iter_mut().zip(&self.content[at..at + 4]) {
                    *b ^= p;
                }
            }

            let twist = TWIST_TABLE[usize::from(t[3] & 7)].to_be_bytes();
            for (b, tw) in t.iter_mut().zip(twist) {
                *b = (*b >> 3) ^ tw;
            }

            self.content[i * 4..i * 4 + 4].copy_from_slice(&t);
            self.length = (self.length + 4).min(POOL_CAPACITY);
        }
    }

    /// Check the bounds (all in bits) and hand out the pool content.
    ///
    /// Bounds that contradict each other or the pool capacity are an error,
    /// and no content is returned. So is a maximum below the length already
    /// accumulated: the content is never cut short.
    pub fn read(&self, min_entropy: u64, min_bits: u64, max_bits: u64) -> Result<PoolRead> {
        let capacity_bits = (POOL_CAPACITY * 8) as u64;
        let available_bits = self.length_bits();
        if min_bits > max_bits
            || min_entropy > max_bits
            || min_bits > capacity_bits
            || min_entropy > capacity_bits
            || max_bits < available_bits
        {
            error!(
                "entropy bounds invalid: min_entropy={min_entropy} min={min_bits} max={max_bits} \
                 (pool holds {available_bits} of {capacity_bits} bits)"
            );
            return Err(DrbgError::EntropyBoundsInvalid {
                min_entropy,
                min_bits,
                max_bits,
            });
        }

        if available_bits < min_entropy.max(min_bits) {
            return Ok(PoolRead::Insufficient { available_bits });
        }

        Ok(PoolRead::Ready(Zeroizing::new(
            self.content[..self.length].to_vec(),
        )))
    }

    /// Accumulated length in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Accumulated length in bits.
    pub fn length_bits(&self) -> u64 {
        (self.length * 8) as u64
    }

    /// Raw pool bytes, including any slots not yet counted in the length.
    pub fn content(&self) -> &[u8; POOL_CAPACITY] {
        &self.content
    }
}

// ---------------------------------------------------------------------------
// Entropy pool
// ---------------------------------------------------------------------------

/// Anything that can hand the DRBG an entropy input.
///
/// Implemented by [`EntropyPool`]; tests substitute scripted inputs.
pub trait EntropyInput: Send {
    /// Refresh and read, with bounds in bits.
    fn draw(&mut self, min_entropy: u64, min_bits: u64, max_bits: u64) -> Result<PoolRead>;
}

/// Pool plus the sources and health history that feed it.
pub struct EntropyPool {
    buffer: PoolBuffer,
    mode: OperatingMode,
    sources: SourceSet,
    health: HealthHistory,
    updates: u64,
}

impl EntropyPool {
    /// Power-on test the sources, then create and fill the pool.
    ///
    /// A failed power-on test means no pool.
    pub fn create(
        mode: OperatingMode,
        mut sources: SourceSet,
        repetition_cutoff: u32,
        power_on_samples: usize,
    ) -> Result<Self> {
        let mut health = HealthHistory::new(repetition_cutoff);
        health.power_on_test(&mut sources, power_on_samples)?;

        let mut pool = Self {
            buffer: PoolBuffer::new(),
            mode,
            sources,
            health,
            updates: 0,
        };
        pool.update()?;
        info!("entropy pool created, {mode}");
        Ok(pool)
    }

    /// Create a pool with the mode and health parameters from `config`.
    pub fn from_config(config: &DrbgConfig, sources: SourceSet) -> Result<Self> {
        let mode = OperatingMode::select(config.mode)?;
        Self::create(
            mode,
            sources,
            config.repetition_cutoff,
            config.power_on_samples,
        )
    }

    /// Take a refresh, health-check it and fold the selected chunks.
    ///
    /// A health failure leaves the pool untouched.
    pub fn update(&mut self) -> Result<()> {
        let mut refresh = self.sources.refresh();
        let checked = self.health.continuous_test(&refresh);
        if let Err(e) = checked {
            refresh.zeroize();
            return Err(e);
        }

        for &chunk in self.mode.chunks() {
            let at = chunk * 4;
            let mut word = [0u8; 4];
            word.copy_from_slice(&refresh[at..at + 4]);
            self.buffer.fold(word);
        }
        refresh.zeroize();

        self.updates += 1;
        debug!(
            "entropy pool updated ({} chunks, {} bits accumulated)",
            self.mode.chunks().len(),
            self.buffer.length_bits()
        );
        Ok(())
    }

    /// Bounds-checked read without a refresh.
    pub fn read(&self, min_entropy: u64, min_bits: u64, max_bits: u64) -> Result<PoolRead> {
        self.buffer.read(min_entropy, min_bits, max_bits)
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Updates applied since creation, including the initial one.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn buffer(&self) -> &PoolBuffer {
        &self.buffer
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }
}

impl EntropyInput for EntropyPool {
    fn draw(&mut self, min_entropy: u64, min_bits: u64, max_bits: u64) -> Result<PoolRead> {
        self.update()?;
        self.read(min_entropy, min_bits, max_bits)
    }
}

const _: () = assert!(REFRESH_SIZE == 14 * 4);
