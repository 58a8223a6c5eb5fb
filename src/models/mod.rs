mod access_code;
mod order;
mod reconciliation_log;

pub use access_code::*;
pub use order::*;
pub use reconciliation_log::*;
