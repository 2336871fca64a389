use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use reqcall_core::utils::Redact;
use reqcall_core::SignConfig;
use serde_json::Value;

/// Digest used for the HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// HMAC-SHA256
    #[default]
    Sha256,
    /// HMAC-SHA1
    Sha1,
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Algorithm::Sha256),
            "sha1" => Ok(Algorithm::Sha1),
            _ => bail!("algorithm must be `sha256` or `sha1`, got `{s}`"),
        }
    }
}

/// Text form of the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Lowercase hex.
    #[default]
    Hex,
    /// Standard base64 with padding.
    Base64,
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            _ => bail!("encoding must be `hex` or `base64`, got `{s}`"),
        }
    }
}

/// Where the signature is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// As an input parameter.
    #[default]
    Input,
    /// As a header.
    Header,
}

impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Location::Input),
            "header" => Ok(Location::Header),
            _ => bail!("location must be `input` or `header`, got `{s}`"),
        }
    }
}

/// Config carries the `sign_config` of a descriptor using the HMAC signer.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Key of the HMAC, from `secret`. Required.
    pub secret: String,
    /// `algorithm`, default to `sha256`.
    pub algorithm: Algorithm,
    /// `encoding`, default to `hex`.
    pub encoding: Encoding,
    /// `field`: name of the signature parameter or header, default to `sign`.
    pub field: String,
    /// `location`, default to `input`.
    pub location: Location,
    /// `timestamp_field`: when set, the unix timestamp is added to the input
    /// under this name before signing.
    pub timestamp_field: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &Redact::from(&self.secret))
            .field("algorithm", &self.algorithm)
            .field("encoding", &self.encoding)
            .field("field", &self.field)
            .field("location", &self.location)
            .field("timestamp_field", &self.timestamp_field)
            .finish()
    }
}

impl Config {
    /// Parse a descriptor's `sign_config`.
    pub fn from_sign_config(config: &SignConfig) -> Result<Self> {
        let secret = string_option(config, "secret")?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("sign_config `secret` is required"))?;

        Ok(Self {
            secret,
            algorithm: parse_option(config, "algorithm")?.unwrap_or_default(),
            encoding: parse_option(config, "encoding")?.unwrap_or_default(),
            field: string_option(config, "field")?
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "sign".to_string()),
            location: parse_option(config, "location")?.unwrap_or_default(),
            timestamp_field: string_option(config, "timestamp_field")?.filter(|v| !v.is_empty()),
        })
    }
}

fn string_option(config: &SignConfig, key: &str) -> Result<Option<String>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("sign_config `{key}` must be a string, got {other}"),
    }
}

fn parse_option<T>(config: &SignConfig, key: &str) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    string_option(config, key)?
        .map(|v| v.parse().map_err(|err| anyhow!("sign_config `{key}`: {err}")))
        .transpose()
}
