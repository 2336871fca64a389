use anyhow::Result;
use reqcall::lua::{LuaConfig, RegisterScript};
use reqcall::{default_context, ApiDescriptor, Client, Header, Input, LogRecordTrace};
use serde_json::json;

const SCRIPT: &str = r#"
function sign(input, header, config)
    local keys = {}
    for k, _ in pairs(input) do
        table.insert(keys, k)
    end
    table.sort(keys)

    local parts = {}
    for _, k in ipairs(keys) do
        table.insert(parts, k .. "=" .. tostring(input[k]))
    end
    header["X-Canonical"] = table.concat(parts, "&")
    header["X-App"] = config.app
    return input, header
end
"#;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let ctx = default_context().with_trace(LogRecordTrace);
    let client = Client::new(ctx.clone());

    // Pool settings may be overridden through REQCALL_LUA_* env values.
    let config = LuaConfig::default().from_env(&ctx);
    client
        .signers()
        .register_script_with_config("canonical", SCRIPT, "sign", config)?;

    let api = ApiDescriptor::new("https://httpbin.org", "/get")
        .with_signer("canonical", json!({"app": "demo"}).as_object().cloned().unwrap_or_default())
        .with_extract_disabled(true);

    let mut input = Input::new();
    input.insert("user".to_string(), json!("alice"));
    input.insert("page".to_string(), json!(2));

    let resp = client.execute(&api, input, Header::new()).await?;
    println!("{:#}", resp.data().cloned().unwrap_or_default());

    Ok(())
}
