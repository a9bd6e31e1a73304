//! FundWatch core — configuration, errors and the run log book.

pub mod config;
pub mod error;
pub mod logbook;

pub use config::RunConfig;
pub use error::{FundWatchError, Result};
pub use logbook::{LogBook, LogLevel};
