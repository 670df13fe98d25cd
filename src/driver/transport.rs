use super::error::TransportError;

/// Remote read capability of a FireWire unit.
///
/// Every call is a blocking transaction: it returns once the responder answered or the
/// transport gave up. Implementations never retry on their own.
pub trait ReadTransport {
    /// Read `count` quadlets starting at the 48-bit bus `address`, in host byte order.
    ///
    /// The length of the result is not checked here; the walker rejects short responses.
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError>;
}

impl<T: ReadTransport + ?Sized> ReadTransport for &mut T {
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError> {
        (**self).read_quadlets(address, count)
    }
}

impl<T: ReadTransport + ?Sized> ReadTransport for Box<T> {
    fn read_quadlets(&mut self, address: u64, count: u32) -> Result<Vec<u32>, TransportError> {
        (**self).read_quadlets(address, count)
    }
}
