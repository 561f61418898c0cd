//! Logging module for plugin fragments
//!
//! Fragments call `log.info("...")` and friends. Where the messages end up is
//! decided by the [`LogSink`] the host hands in:
//! - Engine: buffered into the plugin run result
//! - CLI: printed to the terminal

use crate::module::{ModuleMetadata, SandboxModule};
use mlua::prelude::*;
use relay_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex};

/// Destination for messages logged from a fragment
pub trait LogSink: Send + Sync {
    fn write(&mut self, level: LogLevel, message: &str);
}

/// Collects entries in memory, timestamped at write time
#[derive(Debug, Default)]
pub struct BufferSink {
    entries: Vec<LogEntry>,
}

impl BufferSink {
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl LogSink for BufferSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        self.entries.push(LogEntry::now(level, message));
    }
}

/// Logging module, generic over where the messages go
pub struct LogModule<S: LogSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: LogSink> LogModule<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Builds the module around a sink the caller keeps a handle to
    pub fn shared(sink: Arc<Mutex<S>>) -> Self {
        Self { sink }
    }
}

const LEVELS: [(&str, LogLevel); 4] = [
    ("debug", LogLevel::Debug),
    ("info", LogLevel::Info),
    ("warning", LogLevel::Warning),
    ("error", LogLevel::Error),
];

impl<S: LogSink + 'static> SandboxModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        for (name, level) in LEVELS {
            let sink = self.sink.clone();
            log_table.set(
                name,
                lua.create_function(move |_, msg: String| {
                    sink.lock()
                        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                        .write(level, &msg);
                    Ok(())
                })?,
            )?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Logging for plugin steps
---@class log
log = {}

---Log a debug message
---@param msg string The message to log
function log.debug(msg) end

---Log an info message
---@param msg string The message to log
function log.info(msg) end

---Log a warning message
---@param msg string The message to log
function log.warning(msg) end

---Log an error message
---@param msg string The message to log
function log.error(msg) end
"#
        .to_string()
    }

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            id: self.id(),
            version: "1.0.0",
            description: "Logging from plugin steps",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestLogSink {
        messages: Arc<Mutex<Vec<(LogLevel, String)>>>,
    }

    impl TestLogSink {
        fn new() -> (Self, Arc<Mutex<Vec<(LogLevel, String)>>>) {
            let messages = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    messages: messages.clone(),
                },
                messages,
            )
        }
    }

    impl LogSink for TestLogSink {
        fn write(&mut self, level: LogLevel, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((level, message.to_string()));
        }
    }

    #[test]
    fn test_log_module_registration() {
        let (sink, _messages) = TestLogSink::new();
        let lua = crate::sandbox::create_sandbox().unwrap();
        let module = LogModule::new(sink);

        assert_eq!(module.id(), "log");
        assert!(module.register(&lua).is_ok());

        let result: LuaResult<bool> = lua.load("return type(log.warning) == 'function'").eval();
        assert!(result.unwrap());
    }

    #[test]
    fn test_log_all_levels() {
        let (sink, messages) = TestLogSink::new();
        let lua = Lua::new();
        LogModule::new(sink).register(&lua).unwrap();

        lua.load(r#"log.debug("debug")"#).exec().unwrap();
        lua.load(r#"log.info("info")"#).exec().unwrap();
        lua.load(r#"log.warning("warning")"#).exec().unwrap();
        lua.load(r#"log.error("error")"#).exec().unwrap();

        let logs = messages.lock().unwrap();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs[0], (LogLevel::Debug, "debug".to_string()));
        assert_eq!(logs[1].0, LogLevel::Info);
        assert_eq!(logs[2].0, LogLevel::Warning);
        assert_eq!(logs[3], (LogLevel::Error, "error".to_string()));
    }

    #[test]
    fn test_buffer_sink_keeps_order() {
        let sink = Arc::new(Mutex::new(BufferSink::default()));
        let lua = Lua::new();
        LogModule::shared(sink.clone()).register(&lua).unwrap();

        lua.load(r#"log.info("one"); log.error("two")"#)
            .exec()
            .unwrap();
        drop(lua);

        let entries = Arc::try_unwrap(sink)
            .ok()
            .unwrap()
            .into_inner()
            .unwrap()
            .into_entries();
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_log_module_stubs() {
        let (sink, _messages) = TestLogSink::new();
        let stubs = LogModule::new(sink).stubs();

        assert!(stubs.contains("---@meta"));
        assert!(stubs.contains("log = {}"));
        assert!(stubs.contains("function log.warning"));
    }
}
