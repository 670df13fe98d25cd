use std::collections::BTreeMap;

use super::error::{TransportError, TransportErrorKind};
use super::serde::{quadlets_from_be_bytes, QUADLET_SIZE};
use super::transport::ReadTransport;

/// In-memory stand-in for a unit's address space.
///
/// Quadlets that were never set read back as zero. Every request is recorded, including the
/// one that fails.
#[derive(Debug, Default, Clone)]
pub struct SimulatedUnit {
    memory: BTreeMap<u64, u32>,
    reads: Vec<(u64, u32)>,
    fail_at: Option<usize>,
}

impl SimulatedUnit {
    pub fn new() -> SimulatedUnit {
        SimulatedUnit::default()
    }

    /// Build from a big endian memory image mapped at `base`.
    pub fn from_be_image(base: u64, image: &[u8]) -> anyhow::Result<SimulatedUnit> {
        let quadlets = quadlets_from_be_bytes(image)
            .ok_or_else(|| anyhow::format_err!("image of {} bytes is not quadlet aligned", image.len()))?;
        let mut unit = SimulatedUnit::new();
        unit.write_quadlets(base, &quadlets);
        Ok(unit)
    }

    pub fn write_quadlets(&mut self, address: u64, quadlets: &[u32]) {
        for (i, q) in quadlets.iter().enumerate() {
            self.memory.insert(address + (i * QUADLET_SIZE) as u64, *q);
        }
    }

    /// Make the `index`-th request (0-based) fail with a timeout.
    pub fn fail_at(&mut self, index: usize) {
        self.fail_at = Some(index);
    }

    pub fn reads(&self) -> &[(u64, u32)] {
        &self.reads
    }

    pub fn read_addresses(&self) -> Vec<u64> {
        self.reads.iter().map(|(addr, _)| *addr).collect()
    }
}

impl ReadTransport for SimulatedUnit {
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError> {
        let index = self.reads.len();
        self.reads.push((address, count));
        if self.fail_at == Some(index) {
            return Err(TransportError::new(
                TransportErrorKind::Timeout,
                format!("simulated timeout at {:016x}", address)));
        }
        Ok((0..count as u64)
            .map(|i| *self.memory.get(&(address + i * QUADLET_SIZE as u64)).unwrap_or(&0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_zero() {
        let mut unit = SimulatedUnit::new();
        unit.write_quadlets(0x1004, &[7]);
        assert_eq!(unit.read_quadlets(0x1000, 3).unwrap(), vec![0, 7, 0]);
        assert_eq!(unit.reads(), &[(0x1000, 3)]);
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let mut unit = SimulatedUnit::new();
        unit.fail_at(1);
        assert!(unit.read_quadlets(0x0, 1).is_ok());
        let err = unit.read_quadlets(0x8, 2).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert_eq!(unit.read_addresses(), vec![0x0, 0x8]);
    }

    #[test]
    fn test_from_be_image() {
        let unit = SimulatedUnit::from_be_image(0x2000, &[0, 0, 0, 1, 0xff, 0, 0, 0]);
        let mut unit = unit.unwrap();
        assert_eq!(unit.read_quadlets(0x2000, 2).unwrap(), vec![1, 0xff00_0000]);
        assert!(SimulatedUnit::from_be_image(0, &[0, 1]).is_err());
    }
}
