pub mod driver;
pub mod label;
pub mod layout;
pub mod walker;
