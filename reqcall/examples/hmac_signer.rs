use anyhow::Result;
use reqcall::hmac::HmacSigner;
use reqcall::{default_context, ApiDescriptor, Client, Header, Input};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let client = Client::new(default_context());
    client.signers().register("hmac", HmacSigner::new());

    for info in client.signers().infos() {
        println!("{}: {}", info.name, info.description);
        println!("  config: {}", serde_json::Value::Object(info.config_template));
    }

    let config = json!({
        "secret": std::env::var("REQCALL_HMAC_SECRET").unwrap_or_else(|_| "demo".to_string()),
        "location": "header",
        "field": "X-Signature",
        "timestamp_field": "ts",
    });
    client.descriptors().register(
        "echo",
        ApiDescriptor::new("https://httpbin.org", "/anything")
            .with_method(reqcall::Method::Post)
            .with_content_type(reqcall::ContentType::Json)
            .with_signer("hmac", config.as_object().cloned().unwrap_or_default())
            .with_timeout_ms(5_000)
            .with_extract_disabled(true),
    );

    let mut input = Input::new();
    input.insert("order".to_string(), json!("A-1001"));
    input.insert("amount".to_string(), json!(12.5));

    let resp = client.execute_by_name("echo", input, Header::new()).await?;
    println!("{:#}", resp.data().cloned().unwrap_or_default());

    Ok(())
}
