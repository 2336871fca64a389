// Env values used by LuaConfig::from_env.
pub const REQCALL_LUA_POOL_SIZE: &str = "REQCALL_LUA_POOL_SIZE";
pub const REQCALL_LUA_ACQUIRE_TIMEOUT_MS: &str = "REQCALL_LUA_ACQUIRE_TIMEOUT_MS";
pub const REQCALL_LUA_INSTRUCTION_LIMIT: &str = "REQCALL_LUA_INSTRUCTION_LIMIT";

/// Instructions executed between two budget checks.
pub const HOOK_INSTRUCTION_STEP: u32 = 1000;

/// Deepest table nesting accepted when reading values back from Lua.
pub const MAX_TABLE_DEPTH: usize = 32;
