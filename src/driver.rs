pub mod error;
pub mod fw_cdev;
pub mod serde;
pub mod sim;
pub mod transport;

pub use error::{TransportError, TransportErrorKind};
pub use transport::ReadTransport;
