// Linux capture implementation — AF_PACKET raw sockets.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use crate::classify::{self, FrameSummary};
use crate::error::FramewatchError;

// ---------------------------------------------------------------------------
// AF_PACKET constants
// ---------------------------------------------------------------------------

const ETH_P_ALL: u16 = 0x0003;
const SOL_PACKET: i32 = 263;
const PACKET_ADD_MEMBERSHIP: i32 = 1;
const PACKET_MR_PROMISC: u16 = 1;

#[repr(C)]
struct packet_mreq {
    mr_ifindex: i32,
    mr_type: u16,
    mr_alen: u16,
    mr_address: [u8; 8],
}

/// AF_PACKET capture device bound to one interface.
pub struct AfPacketCapture {
    fd: OwnedFd,
    buffer: Vec<u8>,
    interface: String,
    skipped: u64,
}

impl AfPacketCapture {
    /// Open a raw socket bound to `interface`.
    ///
    /// No kernel filter program is installed: classification happens in
    /// userspace, one frame at a time.
    pub fn new(
        interface: &str,
        buffer_size: u32,
        promiscuous: bool,
    ) -> Result<Self, FramewatchError> {
        // 1. Create raw socket
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (ETH_P_ALL as u32).to_be() as i32,
            )
        };
        if fd < 0 {
            return Err(FramewatchError::CaptureDevice(format!(
                "socket(AF_PACKET) failed: {}",
                io::Error::last_os_error()
            )));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        // 2. Get interface index
        let if_index = if_nametoindex(interface)?;

        // 3. Bind to interface
        let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = ETH_P_ALL.to_be();
        sll.sll_ifindex = if_index as i32;

        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(FramewatchError::CaptureDevice(format!(
                "bind(AF_PACKET, {}) failed: {}",
                interface,
                io::Error::last_os_error()
            )));
        }

        // 4. Set read timeout (500ms) so capture loops can observe shutdown
        let timeout = libc::timeval {
            tv_sec: 0,
            tv_usec: 500_000,
        };
        let ret = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout as *const libc::timeval as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            log::warn!(
                "SO_RCVTIMEO failed on {}: {}",
                interface,
                io::Error::last_os_error()
            );
        }

        // 5. Set receive buffer size
        let buf_size = buffer_size.max(4096) as i32;
        let ret = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &buf_size as *const i32 as *const libc::c_void,
                std::mem::size_of::<i32>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            log::warn!(
                "SO_RCVBUF failed on {}: {}",
                interface,
                io::Error::last_os_error()
            );
        }

        // 6. Optionally enable promiscuous mode
        if promiscuous {
            let mreq = packet_mreq {
                mr_ifindex: if_index as i32,
                mr_type: PACKET_MR_PROMISC,
                mr_alen: 0,
                mr_address: [0u8; 8],
            };
            let ret = unsafe {
                libc::setsockopt(
                    fd.as_raw_fd(),
                    SOL_PACKET,
                    PACKET_ADD_MEMBERSHIP,
                    &mreq as *const packet_mreq as *const libc::c_void,
                    std::mem::size_of::<packet_mreq>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                log::warn!(
                    "PACKET_MR_PROMISC failed on {}: {} (continuing without promiscuous mode)",
                    interface,
                    io::Error::last_os_error()
                );
            }
        }

        let buffer = vec![0u8; buffer_size.max(4096) as usize];

        log::info!(
            "AF_PACKET capture on {} (if_index={}, buffer={})",
            interface,
            if_index,
            buffer.len()
        );

        Ok(Self {
            fd,
            buffer,
            interface: interface.to_string(),
            skipped: 0,
        })
    }

    /// Blocking read of frames from the socket.
    ///
    /// Classified frame summaries are appended to `out` (cleared first).
    /// One blocking read (bounded by the socket timeout) is followed by a
    /// non-blocking drain of whatever else is pending. Frames that fail
    /// classification are counted in [`AfPacketCapture::skipped`].
    pub fn read_frames(&mut self, out: &mut Vec<FrameSummary>) -> Result<(), FramewatchError> {
        out.clear();

        // First read: blocking (waits for data or timeout)
        let n = unsafe {
            libc::recvfrom(
                self.fd.as_raw_fd(),
                self.buffer.as_mut_ptr() as *mut libc::c_void,
                self.buffer.len(),
                0,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EAGAIN)
                || err.raw_os_error() == Some(libc::EWOULDBLOCK)
            {
                return Ok(());
            }
            return Err(FramewatchError::CaptureDevice(format!(
                "recvfrom on {} failed: {}",
                self.interface, err
            )));
        }

        if n > 0 {
            self.classify_into(n as usize, out);
        }

        // Drain additional pending frames with MSG_DONTWAIT
        loop {
            let n = unsafe {
                libc::recvfrom(
                    self.fd.as_raw_fd(),
                    self.buffer.as_mut_ptr() as *mut libc::c_void,
                    self.buffer.len(),
                    libc::MSG_DONTWAIT,
                    std::ptr::null_mut(),
                    std::ptr::null_mut(),
                )
            };

            if n <= 0 {
                break;
            }
            self.classify_into(n as usize, out);
        }

        Ok(())
    }

    fn classify_into(&mut self, len: usize, out: &mut Vec<FrameSummary>) {
        let frame = &self.buffer[..len];
        match classify::classify(frame) {
            Ok(summary) => out.push(summary),
            Err(e) => {
                self.skipped += 1;
                log::trace!("unclassified frame on {}: {}", self.interface, e);
            }
        }
    }

    /// Frames received but not classifiable as IPv4 since this device opened.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Returns the interface name this capture is bound to.
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

fn if_nametoindex(interface: &str) -> Result<u32, FramewatchError> {
    let c_name = std::ffi::CString::new(interface).map_err(|_| {
        FramewatchError::CaptureDevice(format!("invalid interface name: {interface}"))
    })?;
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(FramewatchError::CaptureDevice(format!(
            "unknown interface {}: {}",
            interface,
            io::Error::last_os_error()
        )));
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Access check
// ---------------------------------------------------------------------------

/// Check that we can open AF_PACKET sockets.
pub fn check_capture_access() -> Result<(), FramewatchError> {
    // Root always has access
    if unsafe { libc::getuid() } == 0 {
        return Ok(());
    }

    // Try to open a test socket to check capabilities
    let fd = unsafe {
        libc::socket(
            libc::AF_PACKET,
            libc::SOCK_RAW,
            (ETH_P_ALL as u32).to_be() as i32,
        )
    };
    if fd >= 0 {
        unsafe { libc::close(fd) };
        return Ok(());
    }

    Err(FramewatchError::InsufficientPermission(
        "framewatch requires raw socket access. Either:\n  \
         1. Run with sudo: sudo framewatch\n  \
         2. Grant the capability: sudo setcap cap_net_raw+ep $(command -v framewatch)"
            .to_string(),
    ))
}
