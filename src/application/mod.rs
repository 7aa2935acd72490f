// Application layer - account use cases on top of the ledger store.

pub mod error;
mod service;

pub use error::*;
pub use service::*;
