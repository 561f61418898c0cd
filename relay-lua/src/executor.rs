//! Plugin fragment execution
//!
//! A fragment is the body of a function that receives `input`. It runs on a
//! blocking thread inside a fresh sandbox and races a fixed timeout. The
//! timeout side decides the result; the blocking side is left to finish on
//! its own and is stopped by an instruction hook shortly after the deadline.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mlua::{
    Error as LuaError, HookTriggers, Lua, LuaSerdeExt, ThreadStatus, Value as LuaValue, VmState,
};
use relay_core::domain::log::LogEntry;
use relay_core::domain::plugin::PluginRunResult;
use serde_json::Value as JsonValue;

use crate::module::ModuleRegistry;
use crate::modules::{BufferSink, LogModule};
use crate::sandbox::create_sandbox;

/// Hard bound on a single fragment run
pub const SANDBOX_TIMEOUT: Duration = Duration::from_millis(5000);

/// How long past the deadline the hook lets a fragment keep running
const HOOK_GRACE: Duration = Duration::from_millis(250);

const HOOK_INSTRUCTION_INTERVAL: u32 = 1000;
const MEMORY_LIMIT: usize = 64 * 1024 * 1024;
const CHUNK_NAME: &str = "plugin";

/// Runs `code` with `input` bound and normalises the outcome
///
/// Never returns an `Err`: compile errors, runtime errors, denied
/// capabilities and timeouts all become `success: false` results.
pub async fn execute(code: &str, input: JsonValue) -> PluginRunResult {
    let sink = Arc::new(Mutex::new(BufferSink::default()));
    let deadline = Instant::now() + SANDBOX_TIMEOUT + HOOK_GRACE;
    let source = wrap(code);

    let worker_sink = sink.clone();
    let handle =
        tokio::task::spawn_blocking(move || run_blocking(&source, input, worker_sink, deadline));

    let outcome = match tokio::time::timeout(SANDBOX_TIMEOUT, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => Err(format!("Sandbox worker failed: {}", join_err)),
        Err(_) => {
            tracing::warn!("Plugin fragment timed out after {:?}", SANDBOX_TIMEOUT);
            Err(format!(
                "Timeout: plugin exceeded {} ms",
                SANDBOX_TIMEOUT.as_millis()
            ))
        }
    };

    let logs = drain(&sink);
    match outcome {
        Ok(output) => PluginRunResult::succeeded(output, logs),
        Err(error) => PluginRunResult::failed(error, logs),
    }
}

/// Compiles `code` without running it
pub fn validate(code: &str) -> anyhow::Result<()> {
    let lua = create_sandbox()?;
    lua.load(wrap(code))
        .set_name(CHUNK_NAME)
        .into_function()
        .map_err(|e| anyhow::anyhow!(describe(&e)))?;
    Ok(())
}

/// LuaLS stubs for every module a fragment can see
pub fn generate_stubs() -> String {
    let mut stubs = String::from(
        "---@meta\n\n---Value passed to the plugin step\n---@type any\ninput = nil\n\n",
    );
    stubs.push_str(&registry(Arc::new(Mutex::new(BufferSink::default()))).generate_stubs());
    stubs
}

fn registry(sink: Arc<Mutex<BufferSink>>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register(LogModule::shared(sink));
    registry
}

// Kept on one line so error line numbers match the fragment
fn wrap(code: &str) -> String {
    format!("local input = ...; {}", code)
}

fn run_blocking(
    source: &str,
    input: JsonValue,
    sink: Arc<Mutex<BufferSink>>,
    deadline: Instant,
) -> Result<JsonValue, String> {
    let lua = prepare(sink, deadline).map_err(|e| describe(&e))?;

    let function = lua
        .load(source)
        .set_name(CHUNK_NAME)
        .into_function()
        .map_err(|e| describe(&e))?;

    let input = lua.to_value(&input).map_err(|e| describe(&e))?;
    let value: LuaValue = function.call(input).map_err(|e| describe(&e))?;
    let value = settle(value).map_err(|e| describe(&e))?;

    lua.from_value::<JsonValue>(value)
        .map_err(|e| format!("Plugin returned a value that is not JSON: {}", describe(&e)))
}

fn prepare(sink: Arc<Mutex<BufferSink>>, deadline: Instant) -> mlua::Result<Lua> {
    let lua = create_sandbox()?;
    lua.set_memory_limit(MEMORY_LIMIT)?;
    registry(sink).register_all(&lua)?;

    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTION_INTERVAL),
        move |_lua, _debug| {
            if Instant::now() >= deadline {
                Err(LuaError::RuntimeError(
                    "Timeout: plugin exceeded its time budget".to_string(),
                ))
            } else {
                Ok(VmState::Continue)
            }
        },
    )?;

    Ok(lua)
}

/// Resolves deferred results
///
/// A returned coroutine is resumed until it finishes and its last value is
/// used. A returned function is called with no arguments.
fn settle(mut value: LuaValue) -> mlua::Result<LuaValue> {
    loop {
        value = match value {
            LuaValue::Thread(thread) => {
                let mut last = LuaValue::Nil;
                while matches!(thread.status(), ThreadStatus::Resumable) {
                    last = thread.resume::<LuaValue>(())?;
                }
                last
            }
            LuaValue::Function(function) => function.call::<LuaValue>(())?,
            other => return Ok(other),
        };
    }
}

fn describe(err: &LuaError) -> String {
    match err {
        LuaError::CallbackError { cause, .. } => describe(cause),
        LuaError::RuntimeError(message) => strip_traceback(message),
        LuaError::SyntaxError { message, .. } => strip_traceback(message),
        other => strip_traceback(&other.to_string()),
    }
}

fn strip_traceback(message: &str) -> String {
    match message.find("\nstack traceback:") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

fn drain(sink: &Arc<Mutex<BufferSink>>) -> Vec<LogEntry> {
    let mut guard = sink.lock().unwrap_or_else(|e| e.into_inner());
    std::mem::take(&mut *guard).into_entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::log::LogLevel;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_value() {
        let result = execute("return 1 + 2", JsonValue::Null).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_input_is_bound() {
        let result = execute("return input.x * 2", json!({ "x": 21 })).await;
        assert_eq!(result.output, Some(json!(42)));

        let result = execute("return string.upper(input)", json!("hi")).await;
        assert_eq!(result.output, Some(json!("HI")));
    }

    #[tokio::test]
    async fn test_table_output_becomes_json() {
        let result = execute(r#"return { name = "relay", count = 2 }"#, JsonValue::Null).await;
        assert_eq!(result.output, Some(json!({ "name": "relay", "count": 2 })));
    }

    #[tokio::test]
    async fn test_coroutine_is_settled() {
        let code = r#"
            return coroutine.create(function()
                coroutine.yield(1)
                return input + 1
            end)
        "#;
        let result = execute(code, json!(9)).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, Some(json!(10)));
    }

    #[tokio::test]
    async fn test_thunk_is_settled() {
        let result = execute(r#"return function() return "later" end"#, JsonValue::Null).await;
        assert_eq!(result.output, Some(json!("later")));
    }

    #[tokio::test]
    async fn test_fetch_fails_at_call_time_not_validation() {
        let code = "return fetch('http://x')";
        assert!(validate(code).is_ok());

        let result = execute(code, JsonValue::Null).await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("'fetch' is not available"), "{}", error);
    }

    #[tokio::test]
    async fn test_denied_os_access() {
        let result = execute("return os.time()", JsonValue::Null).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("'os'"));
    }

    #[tokio::test]
    async fn test_runtime_error_is_reported() {
        let result = execute(r#"error("bad input")"#, JsonValue::Null).await;
        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("bad input"), "{}", error);
        assert!(!error.contains("stack traceback"));
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        let started = Instant::now();
        let result = execute("while true do end", JsonValue::Null).await;
        let elapsed = started.elapsed();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Timeout"));
        assert!(elapsed >= SANDBOX_TIMEOUT, "finished early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(6500), "finished late: {:?}", elapsed);
    }

    #[test]
    fn test_hook_stops_runaway_past_deadline() {
        let sink = Arc::new(Mutex::new(BufferSink::default()));
        let deadline = Instant::now() - Duration::from_millis(1);

        let error = run_blocking(&wrap("while true do end"), JsonValue::Null, sink, deadline)
            .unwrap_err();
        assert!(error.contains("time budget"), "{}", error);
    }

    #[tokio::test]
    async fn test_logs_are_captured() {
        let code = r#"
            log.info("starting")
            log.warning("careful")
            return "ok"
        "#;
        let result = execute(code, JsonValue::Null).await;
        assert!(result.success);
        assert_eq!(result.logs.len(), 2);
        assert_eq!(result.logs[0].level, LogLevel::Info);
        assert_eq!(result.logs[1].message, "careful");
    }

    #[test]
    fn test_validate_rejects_syntax_errors() {
        assert!(validate("return 1 +").is_err());
        assert!(validate("if then end").is_err());
        assert!(validate("return input").is_ok());
    }

    #[test]
    fn test_stubs_include_input_and_log() {
        let stubs = generate_stubs();
        assert!(stubs.contains("input = nil"));
        assert!(stubs.contains("function log.info"));
    }
}
