//! Compute module - Boolean network dynamics, attractor analysis and search.

mod attractor;
mod boolean;
mod distance;
mod generator;
mod network;
mod persistence;
mod state;
mod tes;

pub mod search;

pub use attractor::*;
pub use boolean::*;
pub use distance::*;
pub use generator::*;
pub use network::*;
pub use persistence::{NetworkIoError, load_network, save_network};
pub use state::*;
pub use tes::*;
