use std::time::Duration;

use anyhow::Result;
use reqcall_core::{ApiDescriptor, Client, Context, Header, Input, LogRecordTrace};
use reqcall_http_send_reqwest::ReqwestHttpSend;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Create a custom reqwest client with specific configuration
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .user_agent("reqcall-example/1.0")
        .build()?;

    // Per-call timeouts from descriptors override the client's 30 seconds.
    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::new(client))
        .with_trace(LogRecordTrace);
    let client = Client::new(ctx);

    let api = ApiDescriptor::new("https://httpbin.org", "/get")
        .with_static_header("X-Test-Header", "reqcall-example")
        .with_timeout_ms(5_000)
        .with_extract_disabled(true);

    let mut input = Input::new();
    input.insert("message".to_string(), "hello".into());

    match client.execute(&api, input, Header::new()).await {
        Ok(resp) => {
            println!("code: {}", resp.code());
            println!("data: {:#}", resp.data().cloned().unwrap_or_default());
        }
        Err(e) => {
            eprintln!("Request failed: {e}");
        }
    }

    Ok(())
}
