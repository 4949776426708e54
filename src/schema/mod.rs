//! Schema module - Configuration, persisted formats and result types.

mod config;
mod network;
mod search;
mod target;

pub use config::*;
pub use network::*;
pub use search::*;
pub use target::*;

pub(crate) use target::check_row;
