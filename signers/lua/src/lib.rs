//! Lua scripted signers for reqcall.
//!
//! A script defines a global function taking `(input, header, config)` and
//! returning the signed `input, header`:
//!
//! ```lua
//! function sign(input, header, config)
//!     input["app_id"] = config.app_id
//!     header["X-Timestamp"] = tostring(os.time())
//!     return input, header
//! end
//! ```
//!
//! Register it with [`RegisterScript::register_script`] and reference the
//! signer name from an API descriptor. Values are moved between JSON and Lua
//! by the helpers in [`convert`].

mod constants;
pub use constants::{
    REQCALL_LUA_ACQUIRE_TIMEOUT_MS, REQCALL_LUA_INSTRUCTION_LIMIT, REQCALL_LUA_POOL_SIZE,
};

mod config;
pub use config::LuaConfig;

pub mod convert;

mod pool;

mod signer;
pub use signer::{LuaSigner, RegisterScript};
