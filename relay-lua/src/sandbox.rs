//! Lua sandbox creation
//!
//! This module provides a restricted Lua state for running plugin fragments.
//! Only the TABLE, STRING, MATH and COROUTINE libraries are loaded, and every
//! capability listed in [`DENIED_GLOBALS`] is rebound to a value that raises
//! an error when called, indexed or assigned through. Denied names therefore
//! fail at call time with a readable message instead of silently being `nil`.
//!
//! Modules (log, ...) are registered by the caller after creating the sandbox.

use mlua::{Lua, LuaOptions, MultiValue, Result as LuaResult, StdLib, Table};

/// Globals that are rebound to an unusable value
///
/// Covers network access, process and filesystem access, re-entrant code
/// evaluation, dynamic function construction, raw socket/stream constructors
/// and nested sandbox creation.
pub const DENIED_GLOBALS: &[&str] = &[
    "fetch",
    "http",
    "socket",
    "stream",
    "io",
    "os",
    "process",
    "require",
    "load",
    "loadstring",
    "dofile",
    "loadfile",
    "package",
    "debug",
    "sandbox",
];

/// Create a restricted Lua sandbox
///
/// # Security
/// This sandbox prevents:
/// - Network access
/// - File system access
/// - Process execution
/// - Loading or compiling code at runtime
/// - Dumping functions to bytecode (`string.dump`)
///
/// # Example
/// ```no_run
/// use relay_lua::sandbox::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let sum: i32 = lua.load("return 1 + 2").eval()?;
/// assert_eq!(sum, 3);
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE,
        LuaOptions::default(),
    )?;

    let globals = lua.globals();
    for name in DENIED_GLOBALS {
        globals.set(*name, denied_value(&lua, name)?)?;
    }

    let string: Table = globals.get("string")?;
    string.set("dump", denied_value(&lua, "string.dump")?)?;

    Ok(lua)
}

/// A table whose every use raises "'<name>' is not available in the sandbox"
fn denied_value(lua: &Lua, name: &str) -> LuaResult<Table> {
    let message = format!("'{}' is not available in the sandbox", name);
    let raise = lua.create_function(move |_, _: MultiValue| {
        Err::<(), _>(mlua::Error::RuntimeError(message.clone()))
    })?;

    let metatable = lua.create_table()?;
    metatable.set("__call", raise.clone())?;
    metatable.set("__index", raise.clone())?;
    metatable.set("__newindex", raise)?;
    metatable.set("__metatable", false)?;

    let value = lua.create_table()?;
    value.set_metatable(Some(metatable))?;
    Ok(value)
}
