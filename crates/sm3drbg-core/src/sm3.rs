//! SM3 cryptographic hash (GB/T 32905-2016).
//!
//! Streaming implementation: input is staged into 32-bit big-endian words
//! that are written straight into the 68-word message schedule. Every time
//! sixteen words are present the block is expanded and compressed.
//!
//! This is the only hashing primitive in the crate. The derivation function,
//! the DRBG and the known-answer test all sit on top of it.

use zeroize::Zeroize;

/// SM3 output size in bytes.
pub const SM3_OUTPUT_SIZE: usize = 32;

/// SM3 block size in bytes.
pub const SM3_BLOCK_SIZE: usize = 64;

const IV: [u32; 8] = [
    0x7380_166f,
    0x4914_b2b9,
    0x1724_42d7,
    0xda8a_0600,
    0xa96f_30bc,
    0x1631_38aa,
    0xe38d_ee4d,
    0xb0fb_0e4e,
];

const T_LOW: u32 = 0x79cc_4519;
const T_HIGH: u32 = 0x7a87_9d8a;

/// Words per block before the expansion.
const BLOCK_WORDS: usize = SM3_BLOCK_SIZE / 4;

/// Words in the expanded message schedule.
const SCHEDULE_WORDS: usize = 68;

#[inline(always)]
fn p0(x: u32) -> u32 {
    x ^ x.rotate_left(9) ^ x.rotate_left(17)
}

#[inline(always)]
fn p1(x: u32) -> u32 {
    x ^ x.rotate_left(15) ^ x.rotate_left(23)
}

#[inline(always)]
fn ff(j: usize, x: u32, y: u32, z: u32) -> u32 {
    if j < 16 {
        x ^ y ^ z
    } else {
        (x & y) | (x & z) | (y & z)
    }
}

#[inline(always)]
fn gg(j: usize, x: u32, y: u32, z: u32) -> u32 {
    if j < 16 {
        x ^ y ^ z
    } else {
        (x & y) | (!x & z)
    }
}

/// SM3 hash context.
///
/// A context is meant for one computation: feed it with [`update`](Self::update)
/// and consume it with [`finalize`](Self::finalize).
#[derive(Clone)]
pub struct Sm3 {
    /// Chaining value (eight 32-bit words).
    state: [u32; 8],
    /// Message schedule; only the first sixteen words are input.
    schedule: [u32; SCHEDULE_WORDS],
    /// Next free word in the schedule.
    schedule_len: usize,
    /// Bytes waiting for a full word.
    staged: [u8; 4],
    staged_len: usize,
    /// Total number of input bytes.
    total_len: u64,
}

impl Drop for Sm3 {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl Default for Sm3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sm3 {
    /// Create a new SM3 hash context.
    pub fn new() -> Self {
        Self {
            state: IV,
            schedule: [0; SCHEDULE_WORDS],
            schedule_len: 0,
            staged: [0; 4],
            staged_len: 0,
            total_len: 0,
        }
    }

    /// Feed data into the hash computation. Any length is accepted.
    pub fn update(&mut self, data: &[u8]) {
        self.total_len = self.total_len.wrapping_add(data.len() as u64);
        self.absorb(data);
    }

    /// Apply the SM3 padding and return the 32-byte digest.
    pub fn finalize(mut self) -> [u8; SM3_OUTPUT_SIZE] {
        let bit_len = self.total_len.wrapping_mul(8);

        self.absorb(&[0x80]);
        while self.staged_len != 0 {
            self.absorb(&[0x00]);
        }

        // No room left for the two length words in this block.
        if self.schedule_len > BLOCK_WORDS - 2 {
            self.push_word(0);
        }
        while self.schedule_len < BLOCK_WORDS - 2 {
            self.schedule[self.schedule_len] = 0;
            self.schedule_len += 1;
        }
        self.push_word((bit_len >> 32) as u32);
        self.push_word(bit_len as u32);

        let mut out = [0u8; SM3_OUTPUT_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// One-shot: compute the SM3 digest of `data`.
    pub fn digest(data: &[u8]) -> [u8; SM3_OUTPUT_SIZE] {
        let mut ctx = Self::new();
        ctx.update(data);
        ctx.finalize()
    }

    /// One-shot digest over the concatenation of `parts`.
    pub fn digest_parts(parts: &[&[u8]]) -> [u8; SM3_OUTPUT_SIZE] {
        let mut ctx = Self::new();
        for part in parts {
            ctx.update(part);
        }
        ctx.finalize()
    }

    /// Clear everything derived from the input. Runs on drop.
    fn wipe(&mut self) {
        self.state.zeroize();
        self.schedule.zeroize();
        self.staged.zeroize();
        self.schedule_len = 0;
        self.staged_len = 0;
        self.total_len = 0;
    }

    fn absorb(&mut self, mut data: &[u8]) {
        if self.staged_len != 0 {
            let take = (4 - self.staged_len).min(data.len());
            self.staged[self.staged_len..self.staged_len + take].copy_from_slice(&data[..take]);
            self.staged_len += take;
            data = &data[take..];
            if self.staged_len < 4 {
                return;
            }
            self.staged_len = 0;
            self.push_word(u32::from_be_bytes(self.staged));
        }

        let mut words = data.chunks_exact(4);
        for w in &mut words {
            self.push_word(u32::from_be_bytes([w[0], w[1], w[2], w[3]]));
        }
        let rest = words.remainder();
        self.staged[..rest.len()].copy_from_slice(rest);
        self.staged_len = rest.len();
    }

    fn push_word(&mut self, word: u32) {
        self.schedule[self.schedule_len] = word;
        self.schedule_len += 1;
        if self.schedule_len == BLOCK_WORDS {
            self.compress();
            self.schedule_len = 0;
        }
    }

    /// Message expansion followed by the 64-round compression function.
    fn compress(&mut self) {
        let w = &mut self.schedule;
        for j in BLOCK_WORDS..SCHEDULE_WORDS {
            w[j] = p1(w[j - 16] ^ w[j - 9] ^ w[j - 3].rotate_left(15))
                ^ w[j - 13].rotate_left(7)
                ^ w[j - 6];
        }

        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = self.state;
        for j in 0..64 {
            let t = if j < 16 { T_LOW } else { T_HIGH };
            let a12 = a.rotate_left(12);
            let ss1 = a12
                .wrapping_add(e)
                .wrapping_add(t.rotate_left((j % 32) as u32))
                .rotate_left(7);
            let ss2 = ss1 ^ a12;
            let tt1 = ff(j, a, b, c)
                .wrapping_add(d)
                .wrapping_add(ss2)
                .wrapping_add(w[j] ^ w[j + 4]);
            let tt2 = gg(j, e, f, g)
                .wrapping_add(h)
                .wrapping_add(ss1)
                .wrapping_add(w[j]);
            d = c;
            c = b.rotate_left(9);
            b = a;
            a = tt1;
            h = g;
            g = f.rotate_left(19);
            f = e;
            e = p0(tt2);
        }

        for (s, v) in self.state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
            *s ^= v;
        }
    }
}

/// Convenience wrapper around [`Sm3::digest`].
pub fn sm3(data: &[u8]) -> [u8; SM3_OUTPUT_SIZE] {
    Sm3::digest(data)
}
