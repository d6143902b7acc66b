//! playrun configuration layer
//!
//! Every environment read goes through this module; callers consume typed structs.
//!
//! - `env_keys`: key constants and alias chains
//! - `loader`: env_or, env_optional, env_bool, env_list helpers
//! - `schema`: ObservabilityConfig, SandboxSettings

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_list, env_optional, env_or, env_verbatim, split_list};
pub use schema::{ObservabilityConfig, SandboxSettings};
