use super::bindings;
use super::ioctl;
use crate::driver::error::{TransportError, TransportErrorKind};
use crate::driver::serde::{quadlets_from_be_bytes, QUADLET_SIZE};
use crate::driver::transport::ReadTransport;

use std::mem::offset_of;
use std::time::{Duration, Instant};
use std::{os::fd::RawFd, path::Path};
use log::{debug, info, trace, warn};
use nix::poll::{poll, PollFd, PollFlags};
use nix::{fcntl, sys::stat::Mode, unistd};

// ABI version 4 still delivers FW_CDEV_EVENT_RESPONSE for outbound requests
const CDEV_ABI_VERSION: u32 = 4;

// max_rec for S100; every node has to accept it
const MAX_BLOCK_READ_SIZE: usize = 512;

const EVENT_HEADER_SIZE: usize = 12;

pub struct LinuxCdevIO {
    fd: RawFd,
    generation: u32,
    timeout: Duration,
    next_closure: u64,
}

impl Drop for LinuxCdevIO {
    fn drop(&mut self) {
        trace!("Closing firewire character device {}", self.fd);
        if let Err(err) = unistd::close(self.fd) {
            warn!("Cannot close firewire character device {}: {}", self.fd, err);
        }
    }
}

fn ne_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn ne_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset + 8)?;
    let mut raw = [0_u8; 8];
    raw.copy_from_slice(bytes);
    Some(u64::from_ne_bytes(raw))
}

fn rcode_error(rcode: u32, address: u64) -> TransportError {
    let (kind, name) = match rcode {
        bindings::RCODE_CANCELLED => (TransportErrorKind::Timeout, "split transaction timed out"),
        bindings::RCODE_GENERATION => (TransportErrorKind::BusReset, "bus generation changed"),
        bindings::RCODE_NO_ACK => (TransportErrorKind::Disconnected, "no ack from node"),
        bindings::RCODE_SEND_ERROR => (TransportErrorKind::Disconnected, "send error"),
        bindings::RCODE_BUSY => (TransportErrorKind::Protocol, "node busy"),
        bindings::RCODE_CONFLICT_ERROR => (TransportErrorKind::Protocol, "conflict error"),
        bindings::RCODE_DATA_ERROR => (TransportErrorKind::Protocol, "data error"),
        bindings::RCODE_TYPE_ERROR => (TransportErrorKind::Protocol, "type error"),
        bindings::RCODE_ADDRESS_ERROR => (TransportErrorKind::Protocol, "address error"),
        _ => (TransportErrorKind::Protocol, "unknown rcode"),
    };
    TransportError::new(kind, format!("{} (rcode 0x{:02x}) at {:016x}", name, rcode, address))
}

impl LinuxCdevIO {
    pub fn open(path: &Path, timeout: Duration) -> Result<LinuxCdevIO, TransportError> {
        let fd = fcntl::open(path, fcntl::OFlag::O_RDWR | fcntl::OFlag::O_NONBLOCK, Mode::empty())?;
        info!("Opened firewire character device {:?}: {}", path, fd);
        // construct it now, so that it would drop after following error
        let mut device = LinuxCdevIO { fd, generation: 0, timeout, next_closure: 1 };

        let mut bus_reset = bindings::fw_cdev_event_bus_reset::default();
        let mut get_info = bindings::fw_cdev_get_info {
            version: CDEV_ABI_VERSION,
            bus_reset: (&mut bus_reset as *mut bindings::fw_cdev_event_bus_reset) as u64,
            ..bindings::fw_cdev_get_info::default()
        };
        unsafe {
            ioctl::fw_cdev_get_info(device.fd, &mut get_info)?;
        }
        device.generation = bus_reset.generation;
        trace!("LinuxCdevIO card: {}, node: 0x{:04x}, generation: {}",
               get_info.card, bus_reset.node_id, bus_reset.generation);

        Ok(device)
    }

    fn send_read_request(&mut self, address: u64, length: usize) -> Result<u64, TransportError> {
        let tcode = if length == QUADLET_SIZE {
            bindings::TCODE_READ_QUADLET_REQUEST
        } else {
            bindings::TCODE_READ_BLOCK_REQUEST
        };
        let closure = self.next_closure;
        self.next_closure = self.next_closure.wrapping_add(1);

        let request = bindings::fw_cdev_send_request {
            tcode,
            length: length as u32,
            offset: address,
            closure,
            data: 0,
            generation: self.generation,
        };
        unsafe {
            ioctl::fw_cdev_send_request(self.fd, &request)?;
        }
        Ok(closure)
    }

    // Consume events until the response for `closure` arrives. Bus resets on the way only
    // refresh the generation; the pending request is answered with RCODE_GENERATION by the kernel.
    fn wait_response(&mut self, closure: u64, address: u64, length: usize) -> Result<Vec<u8>, TransportError> {
        let data_offset = offset_of!(bindings::fw_cdev_event_response, data);
        let mut buf = vec![0_u8; usize::max(data_offset + length, 256)];
        let deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    format!("no response within {:?} at {:016x}", self.timeout, address)));
            }
            let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];
            match poll(&mut fds, remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int) {
                Ok(0) => continue,
                Ok(_) => (),
                Err(nix::Error::EINTR) => continue,
                Err(err) => return Err(err.into()),
            }
            if fds[0].revents().map_or(false, |ev| ev.intersects(PollFlags::POLLHUP | PollFlags::POLLERR)) {
                return Err(TransportError::new(TransportErrorKind::Disconnected,
                                               "firewire character device hung up"));
            }

            let len = match unistd::read(self.fd, &mut buf) {
                Ok(len) => len,
                Err(nix::Error::EAGAIN) | Err(nix::Error::EINTR) => continue,
                Err(err) => return Err(err.into()),
            };
            let event = &buf[..len];
            let (event_closure, event_type) = match (ne_u64(event, 0), ne_u32(event, 8)) {
                (Some(c), Some(t)) if len >= EVENT_HEADER_SIZE => (c, t),
                _ => {
                    return Err(TransportError::new(TransportErrorKind::Protocol,
                                                   format!("truncated event of {} bytes", len)))
                }
            };

            match event_type {
                bindings::FW_CDEV_EVENT_BUS_RESET => {
                    let generation_offset = offset_of!(bindings::fw_cdev_event_bus_reset, generation);
                    if let Some(generation) = ne_u32(event, generation_offset) {
                        debug!("Bus reset, generation {} -> {}", self.generation, generation);
                        self.generation = generation;
                    }
                }
                bindings::FW_CDEV_EVENT_RESPONSE if event_closure == closure => {
                    let rcode = ne_u32(event, offset_of!(bindings::fw_cdev_event_response, rcode));
                    let data_len = ne_u32(event, offset_of!(bindings::fw_cdev_event_response, length));
                    let (rcode, data_len) = match (rcode, data_len) {
                        (Some(r), Some(l)) => (r, l as usize),
                        _ => {
                            return Err(TransportError::new(TransportErrorKind::Protocol,
                                                           "truncated response event"))
                        }
                    };
                    if rcode != bindings::RCODE_COMPLETE {
                        return Err(rcode_error(rcode, address));
                    }
                    let payload = event.get(data_offset..data_offset + data_len).ok_or_else(|| {
                        TransportError::new(TransportErrorKind::Protocol,
                                            format!("response of {} bytes exceeds event", data_len))
                    })?;
                    if data_len != length {
                        return Err(TransportError::new(
                            TransportErrorKind::Protocol,
                            format!("short response at {:016x}: {} of {} bytes", address, data_len, length)));
                    }
                    return Ok(payload.to_vec());
                }
                other => trace!("Ignoring event type {} (closure {})", other, event_closure),
            }
        }
    }
}

impl ReadTransport for LinuxCdevIO {
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError> {
        let total = count as usize * QUADLET_SIZE;
        let mut raw = Vec::with_capacity(total);
        let mut offset = 0;
        while offset < total {
            let length = usize::min(total - offset, MAX_BLOCK_READ_SIZE);
            let chunk_addr = address + offset as u64;
            let closure = self.send_read_request(chunk_addr, length)?;
            raw.extend_from_slice(&self.wait_response(closure, chunk_addr, length)?);
            offset += length;
        }
        quadlets_from_be_bytes(&raw).ok_or_else(|| {
            TransportError::new(TransportErrorKind::Protocol, "response is not quadlet aligned")
        })
    }
}
