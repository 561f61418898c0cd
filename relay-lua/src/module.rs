use mlua::prelude::*;

/// Trait for modules exposed to plugin fragments.
///
/// Each module provides functionality to code running in the sandbox.
/// Modules must have a unique identifier and register their functions
/// into the Lua global scope under that identifier.
///
/// # Example
///
/// ```rust
/// use relay_lua::module::SandboxModule;
/// use mlua::prelude::*;
///
/// struct ClockModule;
///
/// impl SandboxModule for ClockModule {
///     fn id(&self) -> &'static str {
///         "clock"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("zero", lua.create_function(|_, ()| Ok(0))?)?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\n---@class clock\nclock = {}\n".to_string()
///     }
/// }
/// ```
pub trait SandboxModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// Used as the global variable name in Lua. Must be a valid Lua
    /// identifier and must not collide with a denied global.
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into the Lua state.
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// Lua Language Server stubs for this module, starting with `---@meta`.
    fn stubs(&self) -> String;

    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            id: self.id(),
            version: "0.1.0",
            description: "",
        }
    }
}

/// Metadata about a sandbox module
#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    pub id: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

/// Registry of modules loaded into every plugin sandbox
pub struct ModuleRegistry {
    modules: Vec<Box<dyn SandboxModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: SandboxModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    pub fn get(&self, id: &str) -> Option<&dyn SandboxModule> {
        self.modules
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.as_ref())
    }

    pub fn modules(&self) -> &[Box<dyn SandboxModule>] {
        &self.modules
    }

    /// Registers all modules into a Lua state, stopping at the first error
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }

    /// Combined stub file for all registered modules
    pub fn generate_stubs(&self) -> String {
        let mut stubs = String::new();
        for module in &self.modules {
            stubs.push_str(&module.stubs());
            stubs.push_str("\n\n");
        }
        stubs
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
