pub mod address;
pub mod cli;
pub mod config;
pub mod embed;
pub mod error;
pub mod fingerprint;
mod metrics;
pub mod registry;
pub mod server;
pub mod submission;
pub mod vector;

pub use config::Opts;
pub use error::{Error, Result};
