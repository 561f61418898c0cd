//! Relay Lua sandbox
//!
//! Runs user-supplied plugin fragments for pipeline steps. It includes:
//! - A restricted sandbox with network, process and code-loading globals denied
//! - Module trait and registry for values exposed to fragments
//! - The `log` module
//! - Timed execution and parse-only validation
//! - Stub generation for local development

pub mod executor;
pub mod module;
pub mod modules;
pub mod sandbox;

pub use executor::{SANDBOX_TIMEOUT, execute, generate_stubs, validate};
pub use module::{ModuleMetadata, ModuleRegistry, SandboxModule};
pub use modules::{BufferSink, LogModule, LogSink};
pub use sandbox::{DENIED_GLOBALS, create_sandbox};
