use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use log::debug;

use crate::extract::{extract, ApiResponse};
use crate::request::{build_request, merge_headers};
use crate::trace::TraceScope;
use crate::{ApiDescriptor, Context, DescriptorRegistry, Error, Header, Input, Result, SignerRegistry};

/// Client is the main struct used to call registered APIs.
///
/// By default it resolves descriptors and signers from the process-wide
/// registries; use [`Client::with_descriptors`] and [`Client::with_signers`]
/// to work with private ones.
#[derive(Clone, Debug)]
pub struct Client {
    ctx: Context,
    apis: Arc<DescriptorRegistry>,
    signers: Arc<SignerRegistry>,
}

impl Client {
    /// Create a new client backed by the global registries.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            apis: DescriptorRegistry::global(),
            signers: SignerRegistry::global(),
        }
    }

    /// Use `apis` to resolve descriptors by name.
    pub fn with_descriptors(mut self, apis: Arc<DescriptorRegistry>) -> Self {
        self.apis = apis;
        self
    }

    /// Use `signers` to resolve signers.
    pub fn with_signers(mut self, signers: Arc<SignerRegistry>) -> Self {
        self.signers = signers;
        self
    }

    /// The context used by this client.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The descriptor registry used by this client.
    pub fn descriptors(&self) -> &Arc<DescriptorRegistry> {
        &self.apis
    }

    /// The signer registry used by this client.
    pub fn signers(&self) -> &Arc<SignerRegistry> {
        &self.signers
    }

    /// Call the API registered under `name`.
    pub async fn execute_by_name(
        &self,
        name: &str,
        input: Input,
        header: Header,
    ) -> Result<ApiResponse> {
        let api = self
            .apis
            .resolve(name)
            .ok_or_else(|| Error::descriptor_not_found(name))?;
        self.execute(&api, input, header).await
    }

    /// Call `api` and extract its response.
    ///
    /// Any status other than `200 OK` is returned as
    /// [`crate::ErrorKind::NonSuccessStatus`] and extraction is skipped.
    pub async fn execute(
        &self,
        api: &ApiDescriptor,
        input: Input,
        header: Header,
    ) -> Result<ApiResponse> {
        let resp = self.send(api, input, header).await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::non_success_status(resp.status()));
        }

        Ok(extract(api, &resp))
    }

    /// Call `api` unless `cancel` completes first.
    ///
    /// A cancelled call returns [`crate::ErrorKind::Cancelled`]; the request
    /// future is dropped and no extraction happens.
    pub async fn execute_with_cancel(
        &self,
        api: &ApiDescriptor,
        input: Input,
        header: Header,
        cancel: impl Future<Output = ()>,
    ) -> Result<ApiResponse> {
        tokio::select! {
            biased;

            _ = cancel => {
                debug!("call to {} cancelled by caller", api.url());
                Err(Error::cancelled())
            }
            res = self.execute(api, input, header) => res,
        }
    }

    /// Sign, build and send the request for `api`, returning the raw response.
    ///
    /// The response status is not checked.
    pub async fn send(
        &self,
        api: &ApiDescriptor,
        input: Input,
        header: Header,
    ) -> Result<http::Response<Bytes>> {
        let mut scope = TraceScope::new(&self.ctx, api, &input, &header);

        let res = self.send_inner(api, input, header, &mut scope).await;
        match &res {
            Ok(resp) => scope.success(resp),
            Err(err) => scope.failure(err),
        }
        res
    }

    async fn send_inner(
        &self,
        api: &ApiDescriptor,
        input: Input,
        header: Header,
        scope: &mut TraceScope<'_>,
    ) -> Result<http::Response<Bytes>> {
        let (input, header) = self.sign(api, input, header).await?;
        let header = merge_headers(&api.static_headers, header);
        scope.set_payload(&input, &header);

        let req = build_request(api, &input, &header)?;
        debug!("send {} {} with timeout {:?}", req.method(), req.uri(), api.timeout());

        self.ctx.http_send(req, api.timeout()).await
    }

    async fn sign(&self, api: &ApiDescriptor, input: Input, header: Header) -> Result<(Input, Header)> {
        let Some(name) = api.signer_name() else {
            return Ok((input, header));
        };

        let signer = self
            .signers
            .resolve(name)
            .ok_or_else(|| Error::signer_not_found(name))?;
        signer
            .sign(input, header, &api.signer_config)
            .await
            .map_err(|err| Error::signer_execution(name, format!("{err:#}")).with_source(err))
    }
}
