mod account;
mod ledger;
mod quota;

pub use account::*;
pub use ledger::*;
pub use quota::*;
