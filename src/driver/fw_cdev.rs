#[cfg(all(target_os = "linux", feature = "native_cdev"))]
mod bindings;
#[cfg(all(target_os = "linux", feature = "native_cdev"))]
mod ioctl;
#[cfg(all(target_os = "linux", feature = "native_cdev"))]
mod linux;

use std::path::Path;
use std::time::Duration;

use log::trace;

use super::error::TransportError;
#[cfg(not(all(target_os = "linux", feature = "native_cdev")))]
use super::error::TransportErrorKind;
use super::transport::ReadTransport;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// A FireWire unit reached through its character device (`/dev/fw*`).
pub struct Device {
    io: Box<dyn ReadTransport>,
}

impl Device {
    #[cfg(all(target_os = "linux", feature = "native_cdev"))]
    pub fn open(path: &Path, timeout: Duration) -> Result<Device, TransportError> {
        Ok(Device { io: Box::new(linux::LinuxCdevIO::open(path, timeout)?) })
    }

    #[cfg(not(all(target_os = "linux", feature = "native_cdev")))]
    pub fn open(path: &Path, _timeout: Duration) -> Result<Device, TransportError> {
        Err(TransportError::new(
            TransportErrorKind::Io,
            format!("no firewire character device support on this platform: {:?}", path)))
    }
}

impl ReadTransport for Device {
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        trace!("Read {:016x}: {} quadlets", address, count);
        let quadlets = self.io.read_quadlets(address, count)?;
        trace!("Read {:016x} result: {:08x?}", address, quadlets);
        Ok(quadlets)
    }
}
