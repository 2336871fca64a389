use std::str::FromStr;
use std::time::Duration;

use log::warn;
use reqcall_core::Context;

use crate::constants::*;

/// LuaConfig controls the runtime pool behind a scripted signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LuaConfig {
    /// Maximum number of Lua runtimes, and so of concurrent calls.
    ///
    /// - default to `8`
    /// - env value: [`REQCALL_LUA_POOL_SIZE`]
    pub pool_size: usize,
    /// How long a call waits for a free runtime. `None` waits forever.
    ///
    /// - default to 5 seconds
    /// - env value: [`REQCALL_LUA_ACQUIRE_TIMEOUT_MS`], `0` disables the timeout
    pub acquire_timeout: Option<Duration>,
    /// Lua instructions a single call may execute. `None` is unbounded.
    ///
    /// The budget is enforced even when the script catches errors with
    /// `pcall` or `xpcall`. A call holds one pooled runtime and one blocking
    /// thread until it returns, so an unbounded runaway script pins both for
    /// good.
    ///
    /// - default to `10_000_000`
    /// - env value: [`REQCALL_LUA_INSTRUCTION_LIMIT`], `0` disables the limit
    pub instruction_limit: Option<u64>,
}

impl Default for LuaConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            acquire_timeout: Some(Duration::from_secs(5)),
            instruction_limit: Some(10_000_000),
        }
    }
}

impl LuaConfig {
    /// Set the pool size, at least one runtime is always allowed.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the per call instruction limit.
    pub fn with_instruction_limit(mut self, limit: Option<u64>) -> Self {
        self.instruction_limit = limit;
        self
    }

    /// Load config from env.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if let Some(v) = parse_env::<usize>(ctx, REQCALL_LUA_POOL_SIZE) {
            self = self.with_pool_size(v);
        }
        if let Some(v) = parse_env::<u64>(ctx, REQCALL_LUA_ACQUIRE_TIMEOUT_MS) {
            self.acquire_timeout = (v > 0).then(|| Duration::from_millis(v));
        }
        if let Some(v) = parse_env::<u64>(ctx, REQCALL_LUA_INSTRUCTION_LIMIT) {
            self.instruction_limit = (v > 0).then_some(v);
        }

        self
    }
}

fn parse_env<T: FromStr>(ctx: &Context, key: &str) -> Option<T> {
    let v = ctx.env_var(key)?;
    match v.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring invalid value {v:?} of {key}");
            None
        }
    }
}
