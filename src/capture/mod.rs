// Packet capture.
//
// Linux-only: AF_PACKET raw sockets bound to a single interface. Every
// received frame goes through the classifier; frames that fail
// classification are counted and dropped here, so downstream accounting
// only ever sees classified IPv4 frames.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;
