//! Modules registered into every plugin sandbox

pub mod log;

pub use log::{BufferSink, LogModule, LogSink};
