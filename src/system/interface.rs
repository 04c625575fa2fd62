use std::collections::HashSet;
use std::ffi::CStr;

use crate::error::FramewatchError;

/// Raw interface data from getifaddrs.
#[derive(Debug, Clone)]
pub struct RawInterface {
    pub name: String,
    pub flags: u32,
}

impl RawInterface {
    pub fn is_up(&self) -> bool {
        (self.flags & libc::IFF_UP as u32) != 0
    }

    pub fn is_loopback(&self) -> bool {
        (self.flags & libc::IFF_LOOPBACK as u32) != 0
    }
}

/// Enumerate all network interfaces.
///
/// getifaddrs returns one entry per address; entries are deduplicated by
/// interface name, keeping the first set of flags seen.
pub fn list_interfaces() -> Result<Vec<RawInterface>, FramewatchError> {
    let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
        return Err(FramewatchError::Interface(std::io::Error::last_os_error()));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut cur = ifap;
    while !cur.is_null() {
        let ifa = unsafe { &*cur };
        if !ifa.ifa_name.is_null() {
            let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
                .to_string_lossy()
                .into_owned();
            if seen.insert(name.clone()) {
                out.push(RawInterface {
                    name,
                    flags: ifa.ifa_flags as u32,
                });
            }
        }
        cur = ifa.ifa_next;
    }

    unsafe { libc::freeifaddrs(ifap) };
    Ok(out)
}

/// Pick the first up, non-loopback interface.
pub fn default_interface() -> Result<String, FramewatchError> {
    let interfaces = list_interfaces()?;
    interfaces
        .into_iter()
        .find(|i| i.is_up() && !i.is_loopback())
        .map(|i| i.name)
        .ok_or_else(|| {
            FramewatchError::Fatal(
                "no active non-loopback interface found; pass --interface".to_string(),
            )
        })
}
