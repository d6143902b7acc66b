//! Per-run sandbox and ansible-playbook execution for one CI build.

pub mod agent;
pub mod error;
pub mod log;
pub mod plugin;
pub mod runner;
pub mod sandbox;
pub mod script;
pub mod vars;

pub use error::{RunError, SandboxError};
pub use plugin::Plugin;
pub use runner::{Executor, Invocation};
pub use sandbox::{Artifact, Sandbox, SandboxFiles, REDACTED_ARTIFACTS};
pub use script::ScriptBuilder;
pub use vars::ExtraVars;
