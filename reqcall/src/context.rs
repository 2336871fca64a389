use std::collections::HashMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqcall_core::{Context, Env, HttpSend, Result};
use reqcall_http_send_reqwest::ReqwestHttpSend;
use reqwest::Client;

/// DefaultContext sends requests with reqwest and reads the process
/// environment.
#[derive(Debug, Default, Clone)]
pub struct DefaultContext {
    http: ReqwestHttpSend,
}

impl DefaultContext {
    /// Create a DefaultContext with a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DefaultContext with a configured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            http: ReqwestHttpSend::new(client),
        }
    }

    /// Build a [`Context`] that uses this value for transport and environment.
    pub fn into_context(self) -> Context {
        Context::new().with_http_send(self.clone()).with_env(self)
    }
}

#[async_trait]
impl HttpSend for DefaultContext {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>> {
        self.http.http_send(req, timeout).await
    }
}

impl Env for DefaultContext {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn vars(&self) -> HashMap<String, String> {
        env::vars().collect()
    }
}

/// A [`Context`] backed by [`DefaultContext`].
///
/// Tracing stays disabled, enable it with [`Context::with_trace`].
pub fn default_context() -> Context {
    DefaultContext::new().into_context()
}
