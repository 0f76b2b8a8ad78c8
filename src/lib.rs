pub mod adapters;
pub mod config;
pub mod consolidation;
pub mod errors;
pub mod history;
pub mod models;
pub mod resolve;
pub mod templating;
pub mod utils;

pub use consolidation::ConsolidationEngine;
pub use errors::CoalesceError;
pub use models::{ConsolidationOutput, Finding, Kind};
