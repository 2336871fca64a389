use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqcall_core::{
    ApiDescriptor, Client, Context, Header, HttpSend, Input, OsEnv, Result, Sign, SignConfig,
    SignerRegistry,
};
use std::sync::Arc;

// A signer that reads its credential from the environment
#[derive(Debug)]
struct ApiKeySigner {
    ctx: Context,
}

#[async_trait]
impl Sign for ApiKeySigner {
    async fn sign(
        &self,
        mut input: Input,
        mut header: Header,
        config: &SignConfig,
    ) -> anyhow::Result<(Input, Header)> {
        let api_key = self
            .ctx
            .env_var("MY_API_KEY")
            .unwrap_or_else(|| "demo-api-key".to_string());
        header.insert("X-Api-Key".to_string(), api_key);

        if let Some(tenant) = config.get("tenant") {
            input.insert("tenant".to_string(), tenant.clone());
        }
        Ok((input, header))
    }

    fn description(&self) -> &str {
        "api key from MY_API_KEY"
    }
}

// A transport that prints requests instead of sending them
#[derive(Debug)]
struct DryRun;

#[async_trait]
impl HttpSend for DryRun {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Bytes>> {
        println!("{} {} (timeout {timeout:?})", req.method(), req.uri());
        for (name, value) in req.headers() {
            println!("  {name}: {value:?}");
        }

        Ok(http::Response::new(Bytes::from_static(
            br#"{"code":"0","message":"ok","data":{"dry_run":true}}"#,
        )))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let ctx = Context::new().with_env(OsEnv).with_http_send(DryRun);

    let signers = Arc::new(SignerRegistry::new());
    signers.register("api_key", ApiKeySigner { ctx: ctx.clone() });

    let mut config = SignConfig::new();
    config.insert("tenant".to_string(), "acme".into());
    let api = ApiDescriptor::new("https://api.example.com", "/v1/orders")
        .with_signer("api_key", config)
        .with_timeout_ms(2_000)
        .with_extraction("0", "code", "message", "data");

    let client = Client::new(ctx).with_signers(signers);
    let mut input = Input::new();
    input.insert("page".to_string(), 1.into());

    let resp = client.execute(&api, input, Header::new()).await?;
    println!("code={} message={} data={:?}", resp.code(), resp.message(), resp.data());

    Ok(())
}
