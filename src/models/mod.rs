pub mod export;
pub mod finding;
pub mod severity;

pub use export::{ConsolidationOutput, TargetGroup};
pub use finding::{Finding, Kind, TargetClass};
pub use severity::Severity;
