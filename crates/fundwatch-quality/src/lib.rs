//! Data-quality validation of the fetched report spreadsheet.

pub mod dataset;
pub mod validator;

pub use dataset::Dataset;
pub use validator::{ValidationOutcome, evaluate, latest_spreadsheet, validate};
