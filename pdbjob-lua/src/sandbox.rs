//! Lua sandbox creation
//!
//! Job definitions are plain Lua files. They are evaluated in a restricted
//! sandbox that has no filesystem, process or module-loading access, so
//! reading a definition can never have side effects.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib, Table};

/// LuaLS annotations for the `job` global, written by `pdbjob init`
pub const JOB_MODULE_STUBS: &str = r#"---@meta

---Helpers for pdbjob job definitions
---@class job
job = {}

---Returns the definition table unchanged
---@param definition table
---@return table
function job.define(definition) end

---Activate a named conda environment (or an absolute path to one)
---@param name string
---@return table
function job.conda(name) end

---Activate a virtualenv-style prefix directory
---@param path string
---@return table
function job.prefix(path) end

---Run with the launcher's own environment
---@return table
function job.inherit() end

---Convert every structure in the MD container
---@return string
function job.all() end

---Convert a single structure by PDB code
---@param code string
---@return string
function job.structure(code) end
"#;

/// Create a restricted Lua sandbox
///
/// Only `table`, `string` and `math` are loaded; `io`, `os`, `package` and
/// `debug` are left out, and `require`, `dofile` and `loadfile` are removed.
/// The `job` helper module is always registered.
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = unsafe {
        Lua::unsafe_new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH,
            LuaOptions::default(),
        )
    };

    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    register_job_module(&lua)?;

    Ok(lua)
}

/// Register the `job` helper module
fn register_job_module(lua: &Lua) -> LuaResult<()> {
    let job = lua.create_table()?;

    // job.define(definition) - returns the definition table as-is
    job.set(
        "define",
        lua.create_function(|_, definition: Table| Ok(definition))?,
    )?;

    job.set(
        "conda",
        lua.create_function(|lua, name: String| {
            let env = lua.create_table()?;
            env.set("kind", "conda")?;
            env.set("name", name)?;
            Ok(env)
        })?,
    )?;

    job.set(
        "prefix",
        lua.create_function(|lua, path: String| {
            let env = lua.create_table()?;
            env.set("kind", "prefix")?;
            env.set("path", path)?;
            Ok(env)
        })?,
    )?;

    job.set(
        "inherit",
        lua.create_function(|lua, ()| {
            let env = lua.create_table()?;
            env.set("kind", "inherit")?;
            Ok(env)
        })?,
    )?;

    job.set("all", lua.create_function(|_, ()| Ok("all"))?)?;
    job.set(
        "structure",
        lua.create_function(|_, code: String| Ok(code))?,
    )?;

    lua.globals().set("job", job)?;

    Ok(())
}
