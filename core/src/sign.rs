use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, RwLock};

use log::debug;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

/// Per-call payload: dynamically typed values keyed by name.
pub type Input = serde_json::Map<String, Value>;

/// Per-call headers.
pub type Header = HashMap<String, String>;

/// Signer configuration carried by a descriptor, opaque to everything but the signer.
pub type SignConfig = serde_json::Map<String, Value>;

/// Sign transforms a call's payload and headers before the request is built.
///
/// Returning an error aborts the call: the request is never sent with the
/// unsigned values.
#[async_trait::async_trait]
pub trait Sign: Debug + Send + Sync + 'static {
    /// Produce the input and header that will actually be sent.
    async fn sign(
        &self,
        input: Input,
        header: Header,
        config: &SignConfig,
    ) -> anyhow::Result<(Input, Header)>;

    /// Human readable description of this signer.
    fn description(&self) -> &str {
        ""
    }

    /// Example `sign_config` accepted by this signer.
    fn config_template(&self) -> SignConfig {
        SignConfig::new()
    }
}

/// NativeSigner adapts a plain function into a [`Sign`].
///
/// ```
/// use reqcall_core::{NativeSigner, SignerRegistry};
///
/// let registry = SignerRegistry::new();
/// registry.register(
///     "static_token",
///     NativeSigner::new(|input, mut header, config| {
///         let token = config
///             .get("token")
///             .and_then(|v| v.as_str())
///             .ok_or_else(|| anyhow::anyhow!("missing token"))?;
///         header.insert("Authorization".to_string(), format!("Bearer {token}"));
///         Ok((input, header))
///     }),
/// );
/// assert!(registry.resolve("static_token").is_some());
/// ```
pub struct NativeSigner<F> {
    f: F,
    description: String,
}

impl<F> NativeSigner<F> {
    /// Wrap `f` as a signer.
    pub fn new(f: F) -> Self
    where
        F: Fn(Input, Header, &SignConfig) -> anyhow::Result<(Input, Header)>
            + Send
            + Sync
            + 'static,
    {
        Self {
            f,
            description: String::new(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F> Debug for NativeSigner<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSigner")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<F> Sign for NativeSigner<F>
where
    F: Fn(Input, Header, &SignConfig) -> anyhow::Result<(Input, Header)> + Send + Sync + 'static,
{
    async fn sign(
        &self,
        input: Input,
        header: Header,
        config: &SignConfig,
    ) -> anyhow::Result<(Input, Header)> {
        (self.f)(input, header, config)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Introspection data of a registered signer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignerInfo {
    /// Registered name.
    pub name: String,
    /// Description reported by the signer.
    pub description: String,
    /// Example configuration reported by the signer.
    pub config_template: SignConfig,
}

static GLOBAL: Lazy<Arc<SignerRegistry>> = Lazy::new(Default::default);

/// SignerRegistry maps signer names to signing capabilities.
///
/// Follows the same policy as [`crate::DescriptorRegistry`]: registering an
/// existing name replaces the earlier signer.
#[derive(Debug, Default)]
pub struct SignerRegistry {
    signers: RwLock<HashMap<String, Arc<dyn Sign>>>,
}

impl SignerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<SignerRegistry> {
        GLOBAL.clone()
    }

    /// Register `signer` under `name`, replacing any earlier entry.
    pub fn register(&self, name: impl Into<String>, signer: impl Sign) {
        self.register_arc(name, Arc::new(signer))
    }

    /// Register an already shared signer.
    pub fn register_arc(&self, name: impl Into<String>, signer: Arc<dyn Sign>) {
        let name = name.into();
        debug!("register signer `{name}`: {signer:?}");

        self.signers
            .write()
            .expect("lock poisoned")
            .insert(name, signer);
    }

    /// Register a plain function as signer.
    pub fn register_native<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Input, Header, &SignConfig) -> anyhow::Result<(Input, Header)>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, NativeSigner::new(f))
    }

    /// Resolve the signer registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Sign>> {
        self.signers.read().expect("lock poisoned").get(name).cloned()
    }

    /// Describe every registered signer, sorted by name.
    pub fn infos(&self) -> Vec<SignerInfo> {
        let mut infos: Vec<_> = self
            .signers
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(name, signer)| SignerInfo {
                name: name.clone(),
                description: signer.description().to_string(),
                config_template: signer.config_template(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}
