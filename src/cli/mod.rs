//! CLI command implementations

pub mod error;
pub mod load;

pub use error::CliError;
pub use load::{Cli, StoreKind};
