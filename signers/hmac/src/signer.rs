use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqcall_core::utils::to_plain_string;
use reqcall_core::{Header, Input, Sign, SignConfig};
use serde_json::{json, Value};

use crate::config::{Config, Location};
use crate::hash::{encode, hmac};

/// HmacSigner signs a call's input parameters with a shared secret.
///
/// The string to sign is every input parameter except the signature field,
/// sorted by name and rendered as `k=v` joined by `&`; parameters whose value
/// renders empty are skipped. All options are read from the descriptor's
/// `sign_config`, see [`Config`].
///
/// When `timestamp_field` is configured and the input has no value for it,
/// the current unix timestamp in seconds is added before signing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    /// Create a new HmacSigner.
    pub fn new() -> Self {
        Self
    }
}

/// Build the canonical string for `input`, skipping `field`.
pub fn string_to_sign(input: &Input, field: &str) -> String {
    let mut pairs: Vec<(&str, String)> = input
        .iter()
        .filter(|(k, _)| k.as_str() != field)
        .map(|(k, v)| (k.as_str(), to_plain_string(v)))
        .filter(|(_, v)| !v.is_empty())
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl Sign for HmacSigner {
    async fn sign(
        &self,
        mut input: Input,
        mut header: Header,
        config: &SignConfig,
    ) -> Result<(Input, Header)> {
        let config = Config::from_sign_config(config)?;

        if let Some(field) = &config.timestamp_field {
            if !input.contains_key(field) {
                input.insert(field.clone(), Value::from(chrono::Utc::now().timestamp()));
            }
        }

        let content = string_to_sign(&input, &config.field);
        debug!("hmac string to sign: {content}");
        let signature = encode(
            config.encoding,
            &hmac(config.algorithm, config.secret.as_bytes(), content.as_bytes()),
        );

        match config.location {
            Location::Input => {
                input.insert(config.field, Value::String(signature));
            }
            Location::Header => {
                header.insert(config.field, signature);
            }
        }
        Ok((input, header))
    }

    fn description(&self) -> &str {
        "HMAC over the sorted input parameters"
    }

    fn config_template(&self) -> SignConfig {
        let template = json!({
            "secret": "",
            "algorithm": "sha256",
            "encoding": "hex",
            "field": "sign",
            "location": "input",
            "timestamp_field": "",
        });
        template.as_object().cloned().unwrap_or_default()
    }
}
