pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod verify;

pub use config::Config;
pub use error::{EtlError, Result};
