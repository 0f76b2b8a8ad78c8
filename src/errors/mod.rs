pub mod types;

pub use types::CoalesceError;
