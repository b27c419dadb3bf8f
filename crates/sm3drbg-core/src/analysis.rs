//! Offline min-entropy estimation for the telemetry sources.
//!
//! The estimator fits a first-order Markov model to the bit stream and
//! bounds the probability of the most likely 128-bit sequence by checking
//! the six run shapes that can maximise it. Purely diagnostic: nothing here
//! feeds the generator.

use serde::Serialize;

use crate::source::{Platform, SourceCategory, SourceKind};
use crate::sources::SourceSet;

/// Length of the sequence whose probability is bounded.
const SEQUENCE_BITS: i32 = 128;

/// Default number of bits collected per source.
pub const DEFAULT_ESTIMATE_BITS: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// First-order Markov model of a bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkovModel {
    /// Probability of a 0 bit.
    pub p0: f64,
    /// Probability of a 1 bit.
    pub p1: f64,
    /// Transition probabilities `p_xy = P(next = y | current = x)`.
    pub p00: f64,
    pub p01: f64,
    pub p10: f64,
    pub p11: f64,
}

/// Min-entropy estimate for one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceEstimate {
    pub source: SourceKind,
    pub category: SourceCategory,
    pub platform: Platform,
    pub description: &'static str,
    /// Layout of one sample.
    pub layout: &'static str,
    /// Bits fed to the estimator.
    pub bits: usize,
    /// Samples drawn.
    pub samples: usize,
    /// Samples that failed and were zero-filled.
    pub failures: u64,
    /// Mean time per sample, in microseconds.
    pub mean_collect_us: f64,
    /// Min-entropy per bit, in [0, 1].
    pub min_entropy: f64,
}

// ---------------------------------------------------------------------------
// Bit helpers
// ---------------------------------------------------------------------------

/// Bits of `data`, most significant first.
pub fn bits(data: &[u8]) -> impl Iterator<Item = bool> + '_ {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
}

/// `data` as a string of `'0'` and `'1'`, most significant bit first.
pub fn bits_string(data: &[u8]) -> String {
    bits(data).map(|b| if b { '1' } else { '0' }).collect()
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Fit the Markov model. Transitions are counted over consecutive pairs.
///
/// Returns `None` for an empty input.
pub fn markov_model(data: &[u8]) -> Option<MarkovModel> {
    let mut ones = 0u64;
    let mut total = 0u64;
    // transitions[from][to]
    let mut transitions = [[0u64; 2]; 2];
    let mut prev: Option<usize> = None;

    for bit in bits(data) {
        let b = usize::from(bit);
        total += 1;
        ones += b as u64;
        if let Some(p) = prev {
            transitions[p][b] += 1;
        }
        prev = Some(b);
    }
    if total == 0 {
        return None;
    }

    let from0 = transitions[0][0] + transitions[0][1];
    let from1 = transitions[1][0] + transitions[1][1];
    let p1 = ones as f64 / total as f64;
    Some(MarkovModel {
        p0: 1.0 - p1,
        p1,
        p00: ratio(transitions[0][0], from0),
        p01: ratio(transitions[0][1], from0),
        p10: ratio(transitions[1][0], from1),
        p11: ratio(transitions[1][1], from1),
    })
}

impl MarkovModel {
    /// Upper bound on the probability of any 128-bit sequence.
    pub fn max_sequence_probability(&self) -> f64 {
        let n = SEQUENCE_BITS;
        let half = n / 2;
        [
            self.p0 * self.p00.powi(n - 1),
            self.p0 * self.p01.powi(half) * self.p10.powi(half - 1),
            self.p0 * self.p01 * self.p11.powi(n - 2),
            self.p1 * self.p10 * self.p00.powi(n - 2),
            self.p1 * self.p10.powi(half) * self.p01.powi(half - 1),
            self.p1 * self.p11.powi(n - 1),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    /// Min-entropy per bit, clamped to [0, 1].
    pub fn min_entropy(&self) -> f64 {
        let pmax = self.max_sequence_probability();
        if pmax <= 0.0 {
            return 1.0;
        }
        (-pmax.log2() / f64::from(SEQUENCE_BITS)).clamp(0.0, 1.0)
    }
}

/// Markov min-entropy estimate per bit of `data`. Empty input gives 0.
pub fn markov_min_entropy(data: &[u8]) -> f64 {
    markov_model(data).map_or(0.0, |m| m.min_entropy())
}

// ---------------------------------------------------------------------------
// Per-source collection
// ---------------------------------------------------------------------------

/// Draw about `target_bits` from `kind` and estimate its min-entropy.
pub fn estimate_source(sources: &mut SourceSet, kind: SourceKind, target_bits: usize) -> SourceEstimate {
    let width = kind.width();
    let samples = (target_bits / 8 / width).max(1);
    let before = sources.state(kind);
    let failures_before = before.failures;
    let time_before = before.collect_time;

    let mut data = vec![0u8; samples * width];
    for chunk in data.chunks_exact_mut(width) {
        sources.sample_into(kind, chunk);
    }

    let state = sources.state(kind);
    let info = state.source.info();
    let collect = state.collect_time.saturating_sub(time_before);
    SourceEstimate {
        source: kind,
        category: info.category,
        platform: info.platform,
        description: info.description,
        layout: info.layout,
        bits: data.len() * 8,
        samples,
        failures: state.failures - failures_before,
        mean_collect_us: collect.as_secs_f64() * 1e6 / samples as f64,
        min_entropy: markov_min_entropy(&data),
    }
}

/// [`estimate_source`] for every source, in refresh order.
pub fn estimate_all(sources: &mut SourceSet, target_bits: usize) -> Vec<SourceEstimate> {
    SourceKind::ALL
        .iter()
        .map(|&kind| estimate_source(sources, kind, target_bits))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{FailingSource, counting, with_replaced};

    fn random_data_seeded(n: usize, seed: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(n);
        let mut state: u64 = seed;
        for _ in 0..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            data.push((state >> 33) as u8);
        }
        data
    }

    #[test]
    fn test_bits_string_msb_first() {
        assert_eq!(bits_string(&[0x80, 0x01]), "1000000000000001");
        assert_eq!(bits_string(&[]), "");
    }

    #[test]
    fn test_constant_streams_have_no_entropy() {
        assert_eq!(markov_min_entropy(&[0x00; 4096]), 0.0);
        assert_eq!(markov_min_entropy(&[0xFF; 4096]), 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(markov_model(&[]).is_none());
        assert_eq!(markov_min_entropy(&[]), 0.0);
    }

    #[test]
    fn test_alternating_stream_is_predictable() {
        let h = markov_min_entropy(&[0x55; 4096]);
        assert!(h < 0.01, "alternating bits scored {h}");
        let m = markov_model(&[0x55; 64]).unwrap();
        assert_eq!(m.p01, 1.0);
        assert_eq!(m.p10, 1.0);
        assert_eq!(m.p00, 0.0);
    }

    #[test]
    fn test_random_stream_near_one() {
        let data = random_data_seeded(125_000, 0xdeadbeef);
        let h = markov_min_entropy(&data);
        assert!(h > 0.95, "random bits scored {h}");
        assert!(h <= 1.0);
    }

    #[test]
    fn test_biased_stream_in_between() {
        // One bit in eight set.
        let data: Vec<u8> = random_data_seeded(20_000, 7)
            .into_iter()
            .map(|b| 1u8 << (b & 7))
            .collect();
        let h = markov_min_entropy(&data);
        assert!(h > 0.05 && h < 0.5, "biased bits scored {h}");
    }

    #[test]
    fn test_estimate_all_covers_sources() {
        let mut set = SourceSet::new(counting()).unwrap();
        let report = estimate_all(&mut set, 8_000);
        assert_eq!(report.len(), 7);
        for (est, kind) in report.iter().zip(SourceKind::ALL) {
            assert_eq!(est.source, kind);
            assert_eq!(est.samples, 1000 / kind.width());
            assert_eq!(est.failures, 0);
            assert!(est.min_entropy > 0.0);
        }
    }

    #[test]
    fn test_failing_source_scores_zero() {
        let sources = with_replaced(
            SourceKind::Network,
            Box::new(FailingSource {
                kind: SourceKind::Network,
            }),
        );
        let mut set = SourceSet::new(sources).unwrap();
        let est = estimate_source(&mut set, SourceKind::Network, 6_400);
        assert_eq!(est.samples, 100);
        assert_eq!(est.failures, 100);
        assert_eq!(est.min_entropy, 0.0);
        assert!(est.mean_collect_us >= 0.0);
        let json = serde_json::to_string(&est).unwrap();
        assert!(json.contains("\"source\":\"network\""));
        assert!(json.contains("\"platform\":\"any\""));
        assert!(json.contains("\"description\":\"test source\""));
    }
}
