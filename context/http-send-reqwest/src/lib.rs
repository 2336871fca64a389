//! HTTP transport for reqcall backed by [`reqwest`].
//!
//! ```no_run
//! use reqcall_core::Context;
//! use reqcall_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqcall_core::{Error, HttpSend, RemoteAddr, Result};
use reqwest::{Client, Request};

/// ReqwestHttpSend sends requests with a shared [`reqwest::Client`].
///
/// A per-call timeout overrides whatever timeout the client was built with.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>> {
        let mut req = Request::try_from(req)
            .map_err(|err| Error::request_invalid("invalid request").with_source(err))?;
        if let Some(timeout) = timeout {
            *req.timeout_mut() = Some(timeout);
        }

        let resp = self.client.execute(req).await.map_err(transport_error)?;
        let remote_addr = resp.remote_addr();
        let resp: http::Response<_> = resp.into();

        let (mut parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(transport_error)?;
        if let Some(addr) = remote_addr {
            parts.extensions.insert(RemoteAddr(addr));
        }
        debug!("received {} with {} bytes", parts.status, bs.len());

        Ok(http::Response::from_parts(parts, bs))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "failed to connect"
    } else {
        "failed to send request"
    };
    Error::transport(message).with_source(err)
}
