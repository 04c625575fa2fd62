//! End-to-end pipeline tests through the public library API:
//! raw frames -> classifier -> accumulator -> report -> JSON.

use std::time::Duration;

use framewatch::classify;
use framewatch::cli::OutputFormat;
use framewatch::model::traffic::TrafficAccumulator;
use framewatch::output;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_ARP: u16 = 0x0806;

/// Build a raw Ethernet + IPv4 frame with a fixed 20-byte IPv4 header.
fn build_frame(ethertype: u16, protocol: u8, src: [u8; 4], payload_len: usize) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);
    frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    frame.extend_from_slice(&ethertype.to_be_bytes());

    let total_len = (20 + payload_len) as u16;
    frame.push(0x45);
    frame.push(0x00);
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.push(64);
    frame.push(protocol);
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&[10, 0, 0, 254]);
    frame.extend_from_slice(&vec![0u8; payload_len]);
    frame
}

/// Classify a stream of mixed frames, accumulate the classifiable ones the
/// way the capture layer does, and check the JSON report end to end.
#[test]
fn frames_to_json_report() {
    let frames = vec![
        build_frame(ETHERTYPE_IPV4, 6, [10, 0, 0, 1], 986),  // 1020 bytes
        build_frame(ETHERTYPE_IPV4, 6, [10, 0, 0, 1], 486),  // 520 bytes
        build_frame(ETHERTYPE_IPV4, 17, [10, 0, 0, 2], 66),  // 100 bytes
        build_frame(ETHERTYPE_ARP, 6, [10, 0, 0, 3], 400),   // skipped
        vec![0u8; 9],                                        // skipped, runt
    ];

    let mut acc = TrafficAccumulator::default();
    let mut skipped = 0u64;
    for frame in &frames {
        match classify::classify(frame) {
            Ok(summary) => acc.record(&summary),
            Err(_) => skipped += 1,
        }
    }

    assert_eq!(acc.frames(), 3);
    assert_eq!(skipped, 2);

    let report = acc.to_report("eth0", Duration::from_secs(2), &Default::default());
    let mut buf = Vec::new();
    output::write_report(&report, OutputFormat::Json, &mut buf).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();

    assert_eq!(parsed["interface"].as_str().unwrap(), "eth0");
    assert_eq!(parsed["frames"].as_u64().unwrap(), 3);

    // 10.0.0.1 leads with 1540 bytes over two packets.
    let sources = parsed["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["address"].as_str().unwrap(), "10.0.0.1");
    assert_eq!(sources[0]["packets"].as_u64().unwrap(), 2);
    assert_eq!(sources[0]["bytes"].as_u64().unwrap(), 1540);
    assert_eq!(sources[1]["address"].as_str().unwrap(), "10.0.0.2");

    let protocols = parsed["protocols"].as_array().unwrap();
    assert_eq!(protocols.len(), 2);
    assert_eq!(protocols[0]["name"].as_str().unwrap(), "tcp");
    assert_eq!(protocols[1]["name"].as_str().unwrap(), "udp");
}

/// The zero-sentinel operations and the accumulator agree on which frames
/// count: anything reporting 0 from the sentinel surface never reaches the
/// totals.
#[test]
fn sentinel_gating_matches_accumulation() {
    let classifiable = build_frame(ETHERTYPE_IPV4, 1, [172, 16, 0, 1], 50);
    let non_ipv4 = build_frame(ETHERTYPE_ARP, 1, [172, 16, 0, 1], 50);
    let truncated = &classifiable[..20];

    assert_ne!(classify::frame_length(&classifiable), 0);
    assert_eq!(classify::frame_length(&non_ipv4), 0);
    assert_eq!(classify::frame_length(truncated), 0);

    let mut acc = TrafficAccumulator::default();
    for frame in [&classifiable[..], &non_ipv4[..], truncated] {
        if let Ok(summary) = classify::classify(frame) {
            acc.record(&summary);
        }
    }
    assert_eq!(acc.frames(), 1);

    let report = acc.to_report("eth0", Duration::from_secs(1), &Default::default());
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].address, "172.16.0.1");
    assert_eq!(report.sources[0].bytes, classifiable.len() as u64);
}

/// Pretty output renders the same pipeline results.
#[test]
fn frames_to_pretty_report() {
    let mut acc = TrafficAccumulator::default();
    for _ in 0..5 {
        let frame = build_frame(ETHERTYPE_IPV4, 17, [192, 168, 0, 53], 186);
        acc.record(&classify::classify(&frame).unwrap());
    }

    let report = acc.to_report("wlan0", Duration::from_secs(3), &Default::default());
    let mut buf = Vec::new();
    output::write_report(&report, OutputFormat::Pretty, &mut buf).unwrap();
    let out = String::from_utf8(buf).unwrap();

    assert!(out.contains("wlan0"));
    assert!(out.contains("192.168.0.53"));
    assert!(out.contains("udp (17)"));
    assert!(out.contains("TOTAL"));
}
