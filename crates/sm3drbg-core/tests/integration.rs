//! Integration tests for sm3drbg-core.
//!
//! These tests drive the full pipeline:
//! sources → health tests → pool → DRBG → output / sample file / estimates.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sm3drbg_core::selftest::{KAT_ENTROPY, KAT_NONCE};
use sm3drbg_core::{
    Clock, DerivationVariant, DrbgConfig, DrbgError, EntropyInput, EntropyPool, NoncePadding,
    Platform, SourceCategory, SourceInfo, SourceKind, SourceSet, Sm3Drbg, TelemetrySource,
    WorkingState, estimate_all, known_answer_test, markov_min_entropy, write_samples,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

static INFOS: [SourceInfo; 7] = {
    const fn info(kind: SourceKind) -> SourceInfo {
        SourceInfo {
            kind,
            description: "integration test source",
            layout: "xorshift",
            category: SourceCategory::Timing,
            platform: Platform::Any,
        }
    }
    [
        info(SourceKind::Timestamp),
        info(SourceKind::Cpu),
        info(SourceKind::Memory),
        info(SourceKind::Disk),
        info(SourceKind::Network),
        info(SourceKind::SoftwarePrng),
        info(SourceKind::HardwareRng),
    ]
};

/// Xorshift output that sticks at a constant after `healthy_reads` reads.
struct MockSource {
    kind: SourceKind,
    state: u64,
    reads: u64,
    healthy_reads: u64,
}

impl MockSource {
    fn boxed(kind: SourceKind, healthy_reads: u64) -> Box<dyn TelemetrySource> {
        Box::new(Self {
            kind,
            state: 0x9E37_79B9_7F4A_7C15 ^ (kind.index() as u64 + 1),
            reads: 0,
            healthy_reads,
        })
    }
}

impl TelemetrySource for MockSource {
    fn info(&self) -> &SourceInfo {
        &INFOS[self.kind.index()]
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read(&mut self, out: &mut [u8]) -> io::Result<()> {
        self.reads += 1;
        if self.reads > self.healthy_reads {
            out.fill(0xEE);
            return Ok(());
        }
        for b in out.iter_mut() {
            self.state ^= self.state << 13;
            self.state ^= self.state >> 7;
            self.state ^= self.state << 17;
            *b = self.state as u8;
        }
        Ok(())
    }
}

fn healthy_sources() -> SourceSet {
    SourceSet::new(
        SourceKind::ALL
            .iter()
            .map(|&k| MockSource::boxed(k, u64::MAX))
            .collect(),
    )
    .unwrap()
}

#[derive(Clone, Default)]
struct TestClock(Arc<AtomicU64>);

impl Clock for TestClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn config() -> DrbgConfig {
    DrbgConfig {
        power_on_samples: 64,
        nonce_padding: NoncePadding::Constant,
        ..Default::default()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Conformance
// ---------------------------------------------------------------------------

#[test]
fn known_answer_matches_published_vector() {
    let mut state = WorkingState::instantiate(
        &KAT_ENTROPY,
        &KAT_NONCE,
        b"",
        DerivationVariant::Accumulating,
        0,
    );
    assert_eq!(
        hex(&state.generate(256, b"").unwrap()),
        "1042b1d2b2530e1ebc103754104a98cf692712faed7eb555bca0431c167468bf"
    );
    known_answer_test(DerivationVariant::Accumulating).unwrap();
    known_answer_test(DerivationVariant::Standard).unwrap();
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn pipeline_generates_distinct_blocks() {
    let cfg = config();
    let pool = EntropyPool::from_config(&cfg, healthy_sources()).unwrap();
    let mut drbg = Sm3Drbg::with_parts(cfg, pool, TestClock::default(), b"it").unwrap();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..256 {
        let block = drbg.generate(256, b"").unwrap();
        assert_eq!(block.len(), 32);
        assert!(seen.insert(block), "repeated output block");
    }
    // One update at creation, one for instantiation.
    assert_eq!(drbg.entropy().updates(), 2);
}

#[test]
fn every_mode_instantiates() {
    for mode in 0..=3 {
        let cfg = DrbgConfig { mode, ..config() };
        let pool = EntropyPool::from_config(&cfg, healthy_sources()).unwrap();
        assert_eq!(pool.mode().id(), mode);
        let mut drbg = Sm3Drbg::with_parts(cfg, pool, TestClock::default(), b"").unwrap();
        drbg.generate(256, b"mode").unwrap();
    }
}

#[test]
fn invalid_mode_creates_nothing() {
    let cfg = DrbgConfig { mode: 7, ..config() };
    assert!(matches!(
        EntropyPool::from_config(&cfg, healthy_sources()),
        Err(DrbgError::Configuration(_))
    ));
}

#[test]
fn unreachable_entropy_minimum_fails_immediately() {
    let cfg = DrbgConfig {
        min_entropy_bits: 8192,
        ..config()
    };
    let pool = EntropyPool::from_config(&config(), healthy_sources()).unwrap();
    let start = std::time::Instant::now();
    let result = Sm3Drbg::with_parts(cfg, pool, TestClock::default(), b"");
    assert!(matches!(result, Err(DrbgError::Configuration(_))));
    assert!(start.elapsed() < std::time::Duration::from_millis(500));

    // The pool itself refuses the same request instead of reporting a shortfall.
    let mut pool = EntropyPool::from_config(&config(), healthy_sources()).unwrap();
    assert!(matches!(
        pool.draw(8192, 256, 1 << 35),
        Err(DrbgError::EntropyBoundsInvalid {
            min_entropy: 8192,
            ..
        })
    ));
    // So does a maximum below what the pool already holds.
    assert!(matches!(
        pool.draw(256, 256, 2048),
        Err(DrbgError::EntropyBoundsInvalid { max_bits: 2048, .. })
    ));
}

#[test]
fn stuck_source_blocks_pool_creation() {
    let mut sources: Vec<Box<dyn TelemetrySource>> = SourceKind::ALL
        .iter()
        .map(|&k| MockSource::boxed(k, u64::MAX))
        .collect();
    sources[SourceKind::Memory.index()] = MockSource::boxed(SourceKind::Memory, 5);
    let set = SourceSet::new(sources).unwrap();

    let err = EntropyPool::from_config(&config(), set).err().unwrap();
    assert!(matches!(
        err,
        DrbgError::HealthTestFailure {
            kind: SourceKind::Memory,
            repeats: 11
        }
    ));
}

#[test]
fn source_failing_later_stops_reseed() {
    // Healthy through power-on (64), creation and instantiation, then stuck.
    let mut sources: Vec<Box<dyn TelemetrySource>> = SourceKind::ALL
        .iter()
        .map(|&k| MockSource::boxed(k, u64::MAX))
        .collect();
    sources[SourceKind::Network.index()] = MockSource::boxed(SourceKind::Network, 66);
    let set = SourceSet::new(sources).unwrap();

    let cfg = DrbgConfig {
        repetition_cutoff: 2,
        ..config()
    };
    let clock = TestClock::default();
    let pool = EntropyPool::from_config(&cfg, set).unwrap();
    let mut drbg = Sm3Drbg::with_parts(cfg, pool, clock.clone(), b"").unwrap();
    drbg.generate(256, b"").unwrap();

    // Force reseeds; the stuck network counter trips on the third equal read.
    let mut failure = None;
    for _ in 0..4 {
        clock.0.fetch_add(61, Ordering::SeqCst);
        if let Err(e) = drbg.generate(256, b"") {
            failure = Some(e);
            break;
        }
    }
    assert!(matches!(
        failure,
        Some(DrbgError::HealthTestFailure {
            kind: SourceKind::Network,
            ..
        })
    ));
}

#[test]
fn sample_stream_length() {
    let cfg = config();
    let pool = EntropyPool::from_config(&cfg, healthy_sources()).unwrap();
    let mut drbg = Sm3Drbg::with_parts(cfg, pool, TestClock::default(), b"").unwrap();

    let mut out = Vec::new();
    let written = write_samples(&mut drbg, &mut out, 100_000, b"").unwrap();
    assert_eq!(written, 12_512);
    assert_eq!(out.len(), 12_512);

    // DRBG output should look random to the estimator.
    let h = markov_min_entropy(&out);
    assert!(h > 0.9, "drbg output scored {h}");
}

#[test]
fn config_file_drives_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        br#"{"mode": 1, "power_on_samples": 32, "derivation": "standard", "nonce_padding": "constant"}"#,
    )
    .unwrap();
    let cfg = DrbgConfig::from_path(file.path()).unwrap();
    assert_eq!(cfg.derivation, DerivationVariant::Standard);

    let pool = EntropyPool::from_config(&cfg, healthy_sources()).unwrap();
    assert_eq!(pool.mode().id(), 1);
    let mut drbg = Sm3Drbg::with_parts(cfg, pool, TestClock::default(), b"").unwrap();
    assert_eq!(drbg.generate(128, b"").unwrap().len(), 16);
}

#[test]
fn estimates_for_every_source() {
    let mut sources = healthy_sources();
    let report = estimate_all(&mut sources, 80_000);
    assert_eq!(report.len(), 7);
    for est in &report {
        assert!(est.min_entropy > 0.8, "{} scored {}", est.source, est.min_entropy);
        assert_eq!(est.layout, "xorshift");
        assert_eq!(est.category, SourceCategory::Timing);
    }
    let json = serde_json::to_string_pretty(&report).unwrap();
    assert!(json.contains("hardware_rng"));
}

// ---------------------------------------------------------------------------
// Real system telemetry
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Run with: cargo test -- --ignored
fn system_drbg_instantiates_and_generates() {
    let mut drbg = Sm3Drbg::init(DrbgConfig::default(), b"integration").unwrap();
    let a = drbg.generate(256, b"").unwrap();
    let b = drbg.generate(256, b"").unwrap();
    assert_ne!(a, b);
}

#[test]
#[ignore] // Run with: cargo test -- --ignored
fn system_sources_have_some_entropy() {
    let mut sources = SourceSet::system().unwrap();
    for est in estimate_all(&mut sources, 100_000) {
        assert!(est.bits > 0);
        assert!((0.0..=1.0).contains(&est.min_entropy));
    }
}
