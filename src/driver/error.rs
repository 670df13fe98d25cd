use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    // no response within the transaction timeout
    Timeout,
    // the node went away, or the character device was closed under us
    Disconnected,
    // bus generation changed while the request was in flight
    BusReset,
    // the responder answered with an error rcode, or the response was malformed
    Protocol,
    // the local character device failed
    Io,
}

impl TransportErrorKind {
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Timeout => "fw-req-timeout",
            Self::Disconnected => "fw-unit-disconnected",
            Self::BusReset => "fw-bus-reset",
            Self::Protocol => "fw-req-error",
            Self::Io => "fw-cdev-io",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}: {}", .kind.domain(), .message)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> TransportError {
        TransportError { kind, message: message.into() }
    }
}

#[cfg(target_os = "linux")]
impl From<nix::Error> for TransportError {
    fn from(errno: nix::Error) -> Self {
        let kind = match errno {
            nix::Error::ENODEV => TransportErrorKind::Disconnected,
            nix::Error::ETIMEDOUT => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Io,
        };
        TransportError::new(kind, errno.desc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_domain_and_message() {
        let err = TransportError::new(TransportErrorKind::Timeout, "no response from ffffe0000000");
        assert_eq!(err.to_string(), "fw-req-timeout: no response from ffffe0000000");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_errno_mapping() {
        assert_eq!(TransportError::from(nix::Error::ENODEV).kind, TransportErrorKind::Disconnected);
        assert_eq!(TransportError::from(nix::Error::EIO).kind, TransportErrorKind::Io);
    }
}
