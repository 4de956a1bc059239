pub mod cli;
pub mod config;
pub mod error;
pub mod executor;

// Re-export main types
pub use config::Config;
pub use error::{Result, StrataError};
pub use executor::{Driver, Engine, Node, NodeRef, RunOutcome, StdHost, Val};
