//! Decoded shape of the upstream `/stats` payload.
//! Keep this module minimal and stable; it mirrors the upstream wire format.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CpuStats {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MemoryStats {
    pub total_bytes: i64,
    pub used_bytes: i64,
}

/// One decoded `/stats` response. Built fresh per scrape, discarded once the
/// values are copied into the gauges. Unknown fields (the upstream also
/// reports `thread_count`) are ignored.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ServerSnapshot {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
}
