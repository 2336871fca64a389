use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use log::{debug, warn};
use mlua::{Function, HookTriggers, Lua, LuaOptions, MultiValue, StdLib, Value as LuaValue};
use reqcall_core::{Header, Input, SignConfig};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::constants::HOOK_INSTRUCTION_STEP;
use crate::convert::{from_lua_table, header_from_lua_table, header_to_lua_table, to_lua_table};
use crate::LuaConfig;

/// A validated script: everything needed to build a fresh runtime.
#[derive(Debug)]
pub(crate) struct Script {
    pub(crate) name: String,
    pub(crate) source: String,
    pub(crate) entry: String,
    pub(crate) instruction_limit: Option<u64>,
}

/// One Lua state with the script loaded.
pub(crate) struct Runtime {
    lua: Lua,
    used: Arc<AtomicU64>,
}

impl Runtime {
    /// Build a state with the safe standard libraries minus `coroutine`.
    ///
    /// The instruction hook only watches the main thread; code running in a
    /// coroutine would never be counted.
    pub(crate) fn new(script: &Script) -> Result<Self> {
        let lua = Lua::new_with(StdLib::ALL_SAFE ^ StdLib::COROUTINE, LuaOptions::default())
            .context("create lua state")?;
        let used = Arc::new(AtomicU64::new(0));

        if let Some(limit) = script.instruction_limit {
            let counter = used.clone();
            let step = u64::from(HOOK_INSTRUCTION_STEP);
            lua.set_hook(
                HookTriggers::new().every_nth_instruction(HOOK_INSTRUCTION_STEP),
                move |_lua, _debug| {
                    if counter.fetch_add(step, Ordering::Relaxed) + step > limit {
                        return Err(limit_exceeded(limit));
                    }
                    Ok(())
                },
            );
            guard_protected_calls(&lua, &used, limit).context("install instruction guard")?;
        }

        lua.load(script.source.as_str())
            .set_name(script.name.as_str())
            .exec()
            .context("load script")?;
        match lua.globals().get::<_, LuaValue>(script.entry.as_str())? {
            LuaValue::Function(_) => {}
            LuaValue::Nil => bail!("entry point `{}` is not defined", script.entry),
            other => bail!(
                "entry point `{}` must be a function, got {}",
                script.entry,
                other.type_name()
            ),
        }

        Ok(Self { lua, used })
    }

    /// Call `entry(input, header, config)`, which returns `input, header`.
    fn call(
        &self,
        entry: &str,
        input: &Input,
        header: &Header,
        config: &SignConfig,
    ) -> Result<(Input, Header)> {
        self.used.store(0, Ordering::Relaxed);

        let lua = &self.lua;
        let func: Function = lua.globals().get(entry)?;
        let ret: MultiValue = func.call((
            to_lua_table(lua, input)?,
            header_to_lua_table(lua, header)?,
            to_lua_table(lua, config)?,
        ))?;

        // The header is the last returned value, the input the one before it.
        let mut ret = ret.into_vec();
        let header = match ret.pop() {
            Some(LuaValue::Table(t)) => header_from_lua_table(t)?,
            other => bail!("`{entry}` must return a header table, got {}", type_name(&other)),
        };
        let input = match ret.pop() {
            Some(LuaValue::Table(t)) => from_lua_table(t)?,
            other => bail!("`{entry}` must return an input table, got {}", type_name(&other)),
        };
        Ok((input, header))
    }
}

fn limit_exceeded(limit: u64) -> mlua::Error {
    mlua::Error::RuntimeError(format!("instruction limit of {limit} exceeded"))
}

fn ensure_budget(used: &AtomicU64, limit: u64) -> mlua::Result<()> {
    if used.load(Ordering::Relaxed) > limit {
        return Err(limit_exceeded(limit));
    }
    Ok(())
}

/// Wrap every builtin that can catch an error so that an exhausted
/// instruction budget keeps unwinding up to the caller.
///
/// Without this a script could swallow the hook's error with `pcall` and
/// loop forever.
fn guard_protected_calls(lua: &Lua, used: &Arc<AtomicU64>, limit: u64) -> mlua::Result<()> {
    let globals = lua.globals();

    for name in ["pcall", "xpcall"] {
        let key = format!("reqcall.guarded.{name}");
        lua.set_named_registry_value(&key, globals.get::<_, Function>(name)?)?;

        let used = used.clone();
        let guarded = lua.create_function(move |lua, args: MultiValue| {
            ensure_budget(&used, limit)?;
            let original: Function = lua.named_registry_value(&key)?;
            let ret: MultiValue = original.call(args)?;
            ensure_budget(&used, limit)?;
            Ok(ret)
        })?;
        globals.set(name, guarded)?;
    }
    Ok(())
}

fn type_name(v: &Option<LuaValue>) -> &'static str {
    v.as_ref().map(|v| v.type_name()).unwrap_or("nothing")
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Pool of isolated runtimes for one script.
///
/// Runtimes are created on demand up to `pool_size`. The semaphore bounds
/// how many are checked out, so `idle` never grows past that either.
pub(crate) struct Pool {
    script: Script,
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<Runtime>>,
    acquire_timeout: Option<Duration>,
}

impl Pool {
    /// Validate `script` by building the first runtime.
    pub(crate) fn new(script: Script, config: &LuaConfig) -> Result<Arc<Self>> {
        let first = Runtime::new(&script)?;
        Ok(Arc::new(Self {
            script,
            semaphore: Arc::new(Semaphore::new(config.pool_size.max(1))),
            idle: Mutex::new(vec![first]),
            acquire_timeout: config.acquire_timeout,
        }))
    }

    pub(crate) fn script(&self) -> &Script {
        &self.script
    }

    /// Check out a runtime, waiting at most `acquire_timeout`.
    ///
    /// The returned guard owns its share of the pool, so it can be moved to
    /// a blocking thread.
    pub(crate) async fn acquire(self: &Arc<Self>) -> Result<PooledRuntime> {
        let semaphore = self.semaphore.clone();
        let permit = match self.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, semaphore.acquire_owned())
                .await
                .map_err(|_| anyhow!("timed out after {timeout:?} waiting for a lua runtime"))?,
            None => semaphore.acquire_owned().await,
        }
        .context("lua runtime pool closed")?;

        let idle = self.idle.lock().expect("lock poisoned").pop();
        let runtime = match idle {
            Some(runtime) => runtime,
            None => {
                debug!("creating lua runtime for script `{}`", self.script.name);
                Runtime::new(&self.script)?
            }
        };

        Ok(PooledRuntime {
            pool: self.clone(),
            runtime: Some(runtime),
            _permit: permit,
        })
    }

    #[cfg(test)]
    pub(crate) fn idle_len(&self) -> usize {
        self.idle.lock().unwrap().len()
    }
}

/// A runtime checked out of a [`Pool`], returned on drop.
pub(crate) struct PooledRuntime {
    pool: Arc<Pool>,
    runtime: Option<Runtime>,
    _permit: OwnedSemaphorePermit,
}

impl PooledRuntime {
    /// Run the script's entry point.
    ///
    /// A panic while the runtime is in use discards the runtime.
    pub(crate) fn call(
        &mut self,
        input: &Input,
        header: &Header,
        config: &SignConfig,
    ) -> Result<(Input, Header)> {
        let Some(runtime) = self.runtime.as_ref() else {
            bail!("lua runtime has been discarded");
        };
        let entry = self.pool.script.entry.as_str();

        match catch_unwind(AssertUnwindSafe(|| runtime.call(entry, input, header, config))) {
            Ok(res) => res,
            Err(panic) => {
                warn!(
                    "discarding lua runtime of script `{}` after panic",
                    self.pool.script.name
                );
                self.runtime = None;
                Err(anyhow!("lua runtime panicked: {}", panic_message(&*panic)))
            }
        }
    }
}

impl Drop for PooledRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(runtime);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn script(source: &str, limit: Option<u64>) -> Script {
        Script {
            name: "test".to_string(),
            source: source.to_string(),
            entry: "sign".to_string(),
            instruction_limit: limit,
        }
    }

    const ECHO: &str = "function sign(input, header, config) return input, header end";

    #[test]
    fn test_runtime_rejects_missing_entry() {
        let err = Runtime::new(&script("local x = 1", None)).err().unwrap();
        assert_eq!(err.to_string(), "entry point `sign` is not defined");

        let err = Runtime::new(&script("sign = 42", None)).err().unwrap();
        assert_eq!(err.to_string(), "entry point `sign` must be a function, got integer");
    }

    #[test]
    fn test_runtime_rejects_syntax_and_top_level_errors() {
        assert!(Runtime::new(&script("function sign(", None)).is_err());
        assert!(Runtime::new(&script("error('boom')", None)).is_err());
    }

    #[test]
    fn test_instruction_limit() {
        let rt = Runtime::new(&script(
            "function sign(input, header) while true do end end",
            Some(100_000),
        ))
        .unwrap();

        let err = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("instruction limit of 100000 exceeded"));
    }

    #[test_case("pcall(function() while true do end end)"; "pcall")]
    #[test_case("xpcall(function() while true do end end, function(e) return e end)"; "xpcall")]
    fn test_instruction_limit_cannot_be_caught(catch: &str) {
        let source = format!("function sign(input, header) while true do {catch} end end");
        let rt = Runtime::new(&script(&source, Some(50_000))).unwrap();

        let err = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("instruction limit of 50000 exceeded"));
    }

    #[test]
    fn test_coroutines_are_unavailable() {
        let source = "function sign(input, header) coroutine.wrap(function() while true do end end)() end";
        let rt = Runtime::new(&script(source, Some(50_000))).unwrap();

        let err = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("coroutine"));
    }

    #[test]
    fn test_protected_calls_still_catch_script_errors() {
        let source = r#"
        function sign(input, header)
            local ok, err = pcall(error, "boom")
            input.ok = ok
            input.caught = string.find(err, "boom") ~= nil
            return input, header
        end
        "#;
        let rt = Runtime::new(&script(source, Some(100_000))).unwrap();

        let (input, _) = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap();
        assert_eq!(input["ok"], json!(false));
        assert_eq!(input["caught"], json!(true));
    }

    #[test]
    fn test_instruction_budget_resets_per_call() {
        let source = "function sign(input, header) for i = 1, 20000 do end return input, header end";
        let rt = Runtime::new(&script(source, Some(200_000))).unwrap();

        for _ in 0..20 {
            rt.call("sign", &Input::new(), &Header::new(), &SignConfig::new())
                .unwrap();
        }
    }

    #[test]
    fn test_call_requires_two_tables() {
        let rt = Runtime::new(&script("function sign(input, header) return input end", None)).unwrap();
        let err = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "`sign` must return an input table, got nothing");

        let rt = Runtime::new(&script("function sign(input, header) return input, 'x' end", None)).unwrap();
        let err = rt
            .call("sign", &Input::new(), &Header::new(), &SignConfig::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "`sign` must return a header table, got string");
    }

    #[test]
    fn test_call_passes_config() {
        let rt = Runtime::new(&script(
            "function sign(input, header, config) input.app = config.app return input, header end",
            None,
        ))
        .unwrap();
        let config = json!({"app": "demo"}).as_object().cloned().unwrap();

        let (input, _) = rt
            .call("sign", &Input::new(), &Header::new(), &config)
            .unwrap();
        assert_eq!(input["app"], json!("demo"));
    }

    #[tokio::test]
    async fn test_pool_creates_runtimes_lazily() {
        let config = LuaConfig::default().with_pool_size(3);
        let pool = Pool::new(script(ECHO, None), &config).unwrap();
        assert_eq!(pool.idle_len(), 1);

        {
            let _a = pool.acquire().await.unwrap();
            let _b = pool.acquire().await.unwrap();
            assert_eq!(pool.idle_len(), 0);
        }
        assert_eq!(pool.idle_len(), 2);
    }

    #[tokio::test]
    async fn test_pool_acquire_times_out() {
        let config = LuaConfig::default()
            .with_pool_size(1)
            .with_acquire_timeout(Some(Duration::from_millis(20)));
        let pool = Pool::new(script(ECHO, None), &config).unwrap();

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.err().unwrap();
        assert!(err.to_string().contains("waiting for a lua runtime"));
    }

    #[tokio::test]
    async fn test_pooled_runtime_returns_from_blocking_thread() {
        let pool = Pool::new(script(ECHO, None), &LuaConfig::default()).unwrap();

        let mut runtime = pool.acquire().await.unwrap();
        let res = tokio::task::spawn_blocking(move || {
            runtime.call(&Input::new(), &Header::new(), &SignConfig::new())
        })
        .await
        .unwrap();
        assert!(res.is_ok());
        assert_eq!(pool.idle_len(), 1);
    }
}
