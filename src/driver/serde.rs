// IEEE 1394 payloads carry quadlets in big endian

pub const QUADLET_SIZE: usize = 4;

pub fn quadlets_from_be_bytes(raw: &[u8]) -> Option<Vec<u32>> {
    if raw.len() % QUADLET_SIZE != 0 {
        return None;
    }
    let quadlets = raw
        .chunks_exact(QUADLET_SIZE)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    Some(quadlets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_be_bytes() {
        let raw = [0x00, 0x00, 0x01, 0x00, 0xde, 0xad, 0xbe, 0xef];
        assert_eq!(quadlets_from_be_bytes(&raw), Some(vec![0x100, 0xdeadbeef]));
        assert_eq!(quadlets_from_be_bytes(&[]), Some(vec![]));
    }

    #[test]
    fn test_unaligned_payload() {
        assert_eq!(quadlets_from_be_bytes(&[0x01, 0x02, 0x03]), None);
    }
}
