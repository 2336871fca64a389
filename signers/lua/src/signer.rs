use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use log::debug;
use reqcall_core::{Error, Header, Input, Sign, SignConfig, SignerRegistry};

use crate::pool::{Pool, Script};
use crate::LuaConfig;

/// LuaSigner runs a global Lua function as a signer.
///
/// The function is called as `entry(input, header, config)` and must
/// `return input, header`. Each call gets a runtime of its own from a pool,
/// so concurrent calls never observe each other's state.
///
/// Lua runs synchronously, so calls execute on tokio's blocking thread pool
/// instead of the async worker that awaits them.
pub struct LuaSigner {
    pool: Arc<Pool>,
    description: String,
}

impl LuaSigner {
    /// Compile `source` and check that it defines `entry` as a function.
    ///
    /// Syntax errors, errors raised while running the script's top level and
    /// a missing entry point are all reported here.
    pub fn compile(
        name: impl Into<String>,
        source: impl Into<String>,
        entry: impl Into<String>,
        config: LuaConfig,
    ) -> Result<Self> {
        let script = Script {
            name: name.into(),
            source: source.into(),
            entry: entry.into(),
            instruction_limit: config.instruction_limit,
        };
        let description = format!("lua script `{}` calling `{}`", script.name, script.entry);
        let pool = Pool::new(script, &config)?;

        Ok(Self { pool, description })
    }

    /// Name of the compiled script.
    pub fn name(&self) -> &str {
        &self.pool.script().name
    }

    /// Name of the entry point function.
    pub fn entry(&self) -> &str {
        &self.pool.script().entry
    }
}

impl Debug for LuaSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaSigner")
            .field("name", &self.name())
            .field("entry", &self.entry())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sign for LuaSigner {
    async fn sign(
        &self,
        input: Input,
        header: Header,
        config: &SignConfig,
    ) -> Result<(Input, Header)> {
        let mut runtime = self.pool.acquire().await?;
        let config = config.clone();

        tokio::task::spawn_blocking(move || runtime.call(&input, &header, &config))
            .await
            .context("lua call aborted")?
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Register Lua scripts as signers.
///
/// ```
/// use reqcall_core::SignerRegistry;
/// use reqcall_lua::RegisterScript;
///
/// let registry = SignerRegistry::new();
/// registry
///     .register_script(
///         "stamp",
///         r#"
///         function sign(input, header, config)
///             header["X-App"] = config.app
///             return input, header
///         end
///         "#,
///         "sign",
///     )
///     .unwrap();
/// assert!(registry.resolve("stamp").is_some());
/// ```
pub trait RegisterScript {
    /// Compile and register a script with [`LuaConfig::default`].
    ///
    /// An existing signer with the same name is replaced. On error the
    /// registry is unchanged.
    fn register_script(&self, name: &str, source: &str, entry: &str) -> reqcall_core::Result<()> {
        self.register_script_with_config(name, source, entry, LuaConfig::default())
    }

    /// Compile and register a script with an explicit pool configuration.
    fn register_script_with_config(
        &self,
        name: &str,
        source: &str,
        entry: &str,
        config: LuaConfig,
    ) -> reqcall_core::Result<()>;
}

impl RegisterScript for SignerRegistry {
    fn register_script_with_config(
        &self,
        name: &str,
        source: &str,
        entry: &str,
        config: LuaConfig,
    ) -> reqcall_core::Result<()> {
        let signer = LuaSigner::compile(name, source, entry, config)
            .map_err(|err| Error::script_compilation(name, format!("{err:#}")).with_source(err))?;
        debug!("compiled lua signer {signer:?}");

        self.register(name, signer);
        Ok(())
    }
}
