// Per-source and per-protocol traffic accounting.
//
// The maps are keyed by the raw values the classifier hands back: the
// source key is the 4-byte address field in wire byte order, the protocol
// key is the protocol byte. Keys stay opaque until report time.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::classify::FrameSummary;
use crate::model::{protocol_name, ProtocolReport, SourceReport, TrafficReport};

/// Cumulative totals for one flow bucket (a source address or a protocol).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTotals {
    pub packets: u64,
    pub bytes: u64,
}

impl FlowTotals {
    fn add(&mut self, frame_len: usize) {
        self.packets += 1;
        self.bytes += frame_len as u64;
    }
}

/// Accumulated ingress traffic, one classified frame at a time.
///
/// Frames that fail classification never reach this type; the capture layer
/// drops them before recording.
#[derive(Default)]
pub struct TrafficAccumulator {
    by_source: FxHashMap<u32, FlowTotals>,
    by_protocol: FxHashMap<u8, FlowTotals>,
    frames: u64,
}

impl TrafficAccumulator {
    /// Fold one classified frame into the totals.
    pub fn record(&mut self, summary: &FrameSummary) {
        self.by_source
            .entry(summary.src_addr)
            .or_default()
            .add(summary.frame_len);
        self.by_protocol
            .entry(summary.protocol)
            .or_default()
            .add(summary.frame_len);
        self.frames += 1;
    }

    /// Number of frames recorded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn by_source(&self) -> &FxHashMap<u32, FlowTotals> {
        &self.by_source
    }

    /// Build a serializable report from the current totals.
    ///
    /// `rates` carries bytes/sec per source from the rate tracker; sources
    /// without an entry (first tick, or newly seen) report no rate.
    pub fn to_report(
        &self,
        interface: &str,
        elapsed: Duration,
        rates: &FxHashMap<u32, f64>,
    ) -> TrafficReport {
        let mut sources: Vec<SourceReport> = self
            .by_source
            .iter()
            .map(|(addr, totals)| SourceReport {
                address: Ipv4Addr::from(addr.to_ne_bytes()).to_string(),
                packets: totals.packets,
                bytes: totals.bytes,
                bytes_per_sec: rates.get(addr).copied(),
            })
            .collect();
        sources.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.address.cmp(&b.address)));

        let mut protocols: Vec<ProtocolReport> = self
            .by_protocol
            .iter()
            .map(|(proto, totals)| ProtocolReport {
                protocol: *proto,
                name: protocol_name(*proto),
                packets: totals.packets,
                bytes: totals.bytes,
            })
            .collect();
        protocols.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.protocol.cmp(&b.protocol)));

        TrafficReport {
            interface: interface.to_string(),
            elapsed_secs: elapsed.as_secs_f64(),
            frames: self.frames,
            sources,
            protocols,
        }
    }
}

// ---------------------------------------------------------------------------
// Rate tracking
// ---------------------------------------------------------------------------

/// Byte-rate estimation from successive per-source byte totals.
///
/// Each update compares the current totals against the previous snapshot:
/// rate = delta bytes / delta seconds. The first update establishes the
/// baseline and yields no rates.
pub struct RateTracker {
    last_bytes: FxHashMap<u32, u64>,
    last_instant: Option<Instant>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self {
            last_bytes: FxHashMap::default(),
            last_instant: None,
        }
    }

    /// Update the baseline and return bytes/sec per source seen in both
    /// snapshots.
    pub fn update(&mut self, totals: &FxHashMap<u32, FlowTotals>) -> FxHashMap<u32, f64> {
        self.update_at(totals, Instant::now())
    }

    /// As [`RateTracker::update`], with the observation time injected.
    pub fn update_at(
        &mut self,
        totals: &FxHashMap<u32, FlowTotals>,
        now: Instant,
    ) -> FxHashMap<u32, f64> {
        let mut rates = FxHashMap::default();

        if let Some(then) = self.last_instant {
            let elapsed = now.duration_since(then).as_secs_f64();
            if elapsed > 0.0 {
                for (addr, flow) in totals {
                    if let Some(prev) = self.last_bytes.get(addr) {
                        rates.insert(*addr, (flow.bytes.saturating_sub(*prev)) as f64 / elapsed);
                    }
                }
            }
        }

        self.last_bytes = totals.iter().map(|(a, f)| (*a, f.bytes)).collect();
        self.last_instant = Some(now);
        rates
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}
