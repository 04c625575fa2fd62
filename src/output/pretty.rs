use std::io::Write;

use crate::error::FramewatchError;
use crate::model::TrafficReport;

/// Write a traffic report as a human-readable table.
pub fn write_pretty(report: &TrafficReport, writer: &mut impl Write) -> Result<(), FramewatchError> {
    write_pretty_inner(report, writer).map_err(FramewatchError::Serialization)
}

fn write_pretty_inner(report: &TrafficReport, w: &mut impl Write) -> Result<(), std::io::Error> {
    writeln!(
        w,
        "Ingress IPv4 Traffic on {} ({:.1}s, {} frames)",
        report.interface, report.elapsed_secs, report.frames
    )?;
    writeln!(w, "{}", "=".repeat(62))?;
    writeln!(
        w,
        "{:<18} {:>10} {:>14} {:>14}",
        "SOURCE", "PACKETS", "BYTES", "RATE"
    )?;
    writeln!(w, "{}", "-".repeat(62))?;

    for src in &report.sources {
        let rate = match src.bytes_per_sec {
            Some(r) => format!("{}/s", format_bytes(r as u64)),
            None => "-".to_string(),
        };
        writeln!(
            w,
            "{:<18} {:>10} {:>14} {:>14}",
            src.address,
            src.packets,
            format_bytes(src.bytes),
            rate,
        )?;
    }

    if report.sources.is_empty() {
        writeln!(w, "(no traffic captured)")?;
    }

    writeln!(w, "{}", "-".repeat(62))?;

    // Summary line.
    let total_packets: u64 = report.sources.iter().map(|s| s.packets).sum();
    let total_bytes: u64 = report.sources.iter().map(|s| s.bytes).sum();
    writeln!(
        w,
        "{:<18} {:>10} {:>14}",
        "TOTAL",
        total_packets,
        format_bytes(total_bytes),
    )?;

    // Per-protocol breakdown.
    if !report.protocols.is_empty() {
        writeln!(w)?;
        writeln!(w, "By protocol:")?;
        for proto in &report.protocols {
            let label = match proto.name {
                Some(name) => format!("{} ({})", name, proto.protocol),
                None => format!("protocol {}", proto.protocol),
            };
            writeln!(
                w,
                "  {:<16} {:>10} pkts {:>14}",
                label,
                proto.packets,
                format_bytes(proto.bytes),
            )?;
        }
    }

    Ok(())
}

/// Format a byte count with a binary-unit suffix.
fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProtocolReport, SourceReport};

    fn render(report: &TrafficReport) -> String {
        let mut buf = Vec::new();
        write_pretty(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn report_with_data() -> TrafficReport {
        TrafficReport {
            interface: "eth0".to_string(),
            elapsed_secs: 5.0,
            frames: 4,
            sources: vec![
                SourceReport {
                    address: "10.0.0.2".to_string(),
                    packets: 3,
                    bytes: 4096,
                    bytes_per_sec: Some(819.2),
                },
                SourceReport {
                    address: "10.0.0.3".to_string(),
                    packets: 1,
                    bytes: 60,
                    bytes_per_sec: None,
                },
            ],
            protocols: vec![
                ProtocolReport {
                    protocol: 6,
                    name: Some("tcp"),
                    packets: 3,
                    bytes: 4096,
                },
                ProtocolReport {
                    protocol: 47,
                    name: None,
                    packets: 1,
                    bytes: 60,
                },
            ],
        }
    }

    #[test]
    fn header_and_rows_render() {
        let out = render(&report_with_data());
        assert!(out.contains("Ingress IPv4 Traffic on eth0"));
        assert!(out.contains("SOURCE"));
        assert!(out.contains("10.0.0.2"));
        assert!(out.contains("10.0.0.3"));
        assert!(out.contains("4 frames"));
    }

    #[test]
    fn total_row_sums_sources() {
        let out = render(&report_with_data());
        let total_line = out
            .lines()
            .find(|l| l.starts_with("TOTAL"))
            .expect("missing TOTAL row");
        assert!(total_line.contains('4'), "total packets: {total_line}");
        assert!(total_line.contains("4.1 KiB"), "total bytes: {total_line}");
    }

    #[test]
    fn protocol_section_labels() {
        let out = render(&report_with_data());
        assert!(out.contains("By protocol:"));
        assert!(out.contains("tcp (6)"));
        assert!(out.contains("protocol 47"));
    }

    #[test]
    fn empty_report_renders_placeholder() {
        let out = render(&TrafficReport::empty("eth0"));
        assert!(out.contains("(no traffic captured)"));
        assert!(out.contains("TOTAL"));
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }
}
