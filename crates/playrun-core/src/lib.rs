pub mod config;
pub mod observability;
pub mod run;

pub use run::{BuildMetadata, RunConfig, RunOverrides, Strategy};
