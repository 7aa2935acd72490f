mod codec;
mod error;
mod store;

pub use codec::*;
pub use error::*;
pub use store::*;

/// Default location of the ledger file, relative to the working directory.
pub const DEFAULT_LEDGER_PATH: &str = "users.csv";
