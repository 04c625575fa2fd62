pub mod traffic;

use serde::Serialize;

/// A point-in-time snapshot of accumulated ingress traffic, ready for output.
#[derive(Clone, Serialize)]
pub struct TrafficReport {
    /// Interface the traffic was captured on.
    pub interface: String,
    /// Seconds since accumulation started.
    pub elapsed_secs: f64,
    /// Number of classified frames folded into this report.
    pub frames: u64,
    /// Per-source rows, sorted by total bytes descending.
    pub sources: Vec<SourceReport>,
    /// Per-protocol rows, sorted by total bytes descending.
    pub protocols: Vec<ProtocolReport>,
}

/// Accumulated traffic for one source address.
#[derive(Clone, Serialize)]
pub struct SourceReport {
    /// Dotted-quad source address.
    pub address: String,
    pub packets: u64,
    pub bytes: u64,
    /// Byte rate since the previous report tick; absent on the first tick
    /// and for sources not seen before it.
    pub bytes_per_sec: Option<f64>,
}

/// Accumulated traffic for one IP protocol number.
#[derive(Clone, Serialize)]
pub struct ProtocolReport {
    /// IP protocol number, verbatim.
    pub protocol: u8,
    /// Well-known protocol name, if any.
    pub name: Option<&'static str>,
    pub packets: u64,
    pub bytes: u64,
}

/// Well-known name for an IP protocol number.
pub fn protocol_name(proto: u8) -> Option<&'static str> {
    match proto {
        1 => Some("icmp"),
        6 => Some("tcp"),
        17 => Some("udp"),
        _ => None,
    }
}

impl TrafficReport {
    pub fn empty(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            elapsed_secs: 0.0,
            frames: 0,
            sources: Vec::new(),
            protocols: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_names_cover_the_documented_set() {
        assert_eq!(protocol_name(1), Some("icmp"));
        assert_eq!(protocol_name(6), Some("tcp"));
        assert_eq!(protocol_name(17), Some("udp"));
        assert_eq!(protocol_name(47), None);
        assert_eq!(protocol_name(0), None);
    }

    #[test]
    fn empty_report_has_no_rows() {
        let report = TrafficReport::empty("eth0");
        assert_eq!(report.interface, "eth0");
        assert_eq!(report.frames, 0);
        assert!(report.sources.is_empty());
        assert!(report.protocols.is_empty());
    }
}
