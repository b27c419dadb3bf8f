//! TimestampSource: low bits of the wall clock, plus boot-time lookup for the nonce.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::source::{Platform, SourceCategory, SourceInfo, SourceKind, TelemetrySource};

use super::helpers::{parse_stat_btime, put_be, unix_nanos};

static TIMESTAMP_INFO: SourceInfo = SourceInfo {
    kind: SourceKind::Timestamp,
    description: "Low 32 bits of the Unix time in nanoseconds",
    layout: "nanos(4)",
    category: SourceCategory::Timing,
    platform: Platform::Any,
};

/// Reads the nanosecond wall clock.
pub struct TimestampSource;

impl TelemetrySource for TimestampSource {
    fn info(&self) -> &SourceInfo {
        &TIMESTAMP_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read(&mut self, out: &mut [u8]) -> std::io::Result<()> {
        put_be(out, unix_nanos() as u64);
        Ok(())
    }
}

/// System boot time in Unix seconds.
///
/// Tries `btime` from `/proc/stat`, then `now - uptime`, then gives up with 0.
pub fn boot_time() -> u64 {
    if let Some(btime) = std::fs::read_to_string("/proc/stat")
        .ok()
        .as_deref()
        .and_then(parse_stat_btime)
    {
        return btime;
    }

    let uptime = std::fs::read_to_string("/proc/uptime").ok().and_then(|raw| {
        raw.split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
    });
    match uptime {
        Some(up) => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            now.saturating_sub(up as u64)
        }
        None => 0,
    }
}
