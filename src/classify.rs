// Frame classification — the per-frame hot path.
//
// Extracts the IP protocol number, the IPv4 source-address field, and the
// total frame length from one raw Ethernet frame. Every header read is
// preceded by an explicit length check against the named layout constants;
// nothing outside the caller's slice is ever touched. No allocation, no
// loops, no recursion.

use std::net::Ipv4Addr;

// ---------------------------------------------------------------------------
// Header layout constants
// ---------------------------------------------------------------------------

// Ethernet
pub const ETH_HLEN: usize = 14;
const ETHERTYPE_OFFSET: usize = 12;
const ETHERTYPE_IPV4: u16 = 0x0800;

// IPv4 (offsets relative to the start of the IPv4 header)
pub const IPV4_HLEN: usize = 20;
const IPV4_PROTO_OFFSET: usize = 9;
const IPV4_SRC_OFFSET: usize = 12;

// ---------------------------------------------------------------------------
// Classification result
// ---------------------------------------------------------------------------

/// Why a frame could not be classified.
///
/// The zero-sentinel operations ([`protocol`], [`source_address`],
/// [`frame_length`]) collapse all three causes into `0`; this type is the
/// opt-in surface that keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("frame too short for an Ethernet header: {len} bytes")]
    TruncatedEthernet { len: usize },
    #[error("not an IPv4 frame: ethertype {ethertype:#06x}")]
    NotIpv4 { ethertype: u16 },
    #[error("frame too short for an IPv4 header: {len} bytes")]
    TruncatedIpv4 { len: usize },
}

/// Fields extracted from a single classified IPv4 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    /// IP protocol number (1 = ICMP, 6 = TCP, 17 = UDP), read verbatim.
    pub protocol: u8,
    /// The source-address field exactly as stored on the wire: the value's
    /// native-endian byte representation is the four address octets in
    /// transmission order. Not converted to host byte order — consumers use
    /// it as an opaque map key.
    pub src_addr: u32,
    /// Total captured frame length in bytes, Ethernet header included.
    /// This is the buffer length, not the IPv4 total-length field.
    pub frame_len: usize,
}

impl FrameSummary {
    /// The source address in display/lookup form.
    pub fn src_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src_addr.to_ne_bytes())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one raw Ethernet frame.
///
/// Checks run in a fixed order: Ethernet length, then EtherType, then
/// combined Ethernet+IPv4 length. The IPv4 offsets are only meaningful once
/// the Ethernet header is known to be in bounds, so the order is load-bearing.
///
/// The EtherType comparison happens in host byte order (it is matched against
/// a constant); the protocol byte and the source-address field are returned
/// as raw wire bytes.
pub fn classify(frame: &[u8]) -> Result<FrameSummary, ClassifyError> {
    if frame.len() < ETH_HLEN {
        return Err(ClassifyError::TruncatedEthernet { len: frame.len() });
    }

    let ethertype = u16::from_be_bytes([frame[ETHERTYPE_OFFSET], frame[ETHERTYPE_OFFSET + 1]]);
    if ethertype != ETHERTYPE_IPV4 {
        return Err(ClassifyError::NotIpv4 { ethertype });
    }

    if frame.len() < ETH_HLEN + IPV4_HLEN {
        return Err(ClassifyError::TruncatedIpv4 { len: frame.len() });
    }

    let ip = &frame[ETH_HLEN..];
    Ok(FrameSummary {
        protocol: ip[IPV4_PROTO_OFFSET],
        src_addr: u32::from_ne_bytes([
            ip[IPV4_SRC_OFFSET],
            ip[IPV4_SRC_OFFSET + 1],
            ip[IPV4_SRC_OFFSET + 2],
            ip[IPV4_SRC_OFFSET + 3],
        ]),
        frame_len: frame.len(),
    })
}

// ---------------------------------------------------------------------------
// Zero-sentinel compatibility surface
// ---------------------------------------------------------------------------
//
// These three operations mirror the map-update consumers' expectations: any
// failure (too short for Ethernet, not IPv4, too short for IPv4) is reported
// as 0, indistinguishable from a field that is numerically zero. Use
// `classify` when the cause matters.

/// The IP protocol byte of an IPv4 frame, or 0 if the frame is not
/// classifiable IPv4.
pub fn protocol(frame: &[u8]) -> u8 {
    classify(frame).map(|s| s.protocol).unwrap_or(0)
}

/// The raw IPv4 source-address field of the frame (wire byte order), or 0 if
/// the frame is not classifiable IPv4.
pub fn source_address(frame: &[u8]) -> u32 {
    classify(frame).map(|s| s.src_addr).unwrap_or(0)
}

/// The total frame length in bytes, or 0 if the frame is not classifiable
/// IPv4 — even though a truncated or non-IPv4 buffer has a well-defined
/// nonzero length. The gating matches the other two operations so that all
/// three agree on which frames count.
pub fn frame_length(frame: &[u8]) -> usize {
    classify(frame).map(|s| s.frame_len).unwrap_or(0)
}

// ===========================================================================
// Unit tests
// ===========================================================================
