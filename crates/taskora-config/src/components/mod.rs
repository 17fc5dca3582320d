//! Component configurations
//!
//! One module per concern, each with serde-friendly structs and `Default`
//! impls holding safe defaults.

mod backend;
mod email;
mod payments;
mod query;
mod server;

pub use backend::*;
pub use email::*;
pub use payments::*;
pub use query::*;
pub use server::*;
