//! Declarative description of one external API endpoint.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::utils::{Redact, RedactHeader};
use crate::{Error, Header, SignConfig};

/// HTTP method supported by descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Payload travels as query parameters.
    #[default]
    Get,
    /// Payload travels in the body.
    Post,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            _ => Err(Error::config_invalid(format!("unsupported method `{s}`"))),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
        }
    }
}

/// Body encoding used for POST requests.
///
/// Only [`ContentType::Json`] keeps typed values; every other content type is
/// sent as multipart form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// Form fields, sent as `multipart/form-data`.
    #[default]
    Form,
}

impl ContentType {
    /// MIME name of this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mime = s.split(';').next().unwrap_or_default().trim();
        match mime.to_ascii_lowercase().as_str() {
            "json" | "application/json" => Ok(ContentType::Json),
            "" | "form" | "multipart" | "application/x-www-form-urlencoded"
            | "multipart/form-data" => Ok(ContentType::Form),
            _ => Err(Error::config_invalid(format!(
                "unsupported content type `{s}`"
            ))),
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(Method);
serde_via_str!(ContentType);

/// ApiDescriptor is the declarative contract for one endpoint.
///
/// Descriptors are shared behind `Arc` once registered and never mutated
/// afterwards. The serde field names match the configuration format used by
/// external loaders:
///
/// ```
/// use reqcall_core::{ApiDescriptor, Method};
///
/// let api: ApiDescriptor = serde_json::from_str(r#"{
///     "host": "https://api.example.com",
///     "path": "/v1/user",
///     "method": "GET",
///     "sign": "hmac",
///     "sign_config": {"secret": "s3cr3t"},
///     "success_code": "0",
///     "code_key": "ret",
///     "message_key": "msg",
///     "data_key": "payload"
/// }"#).unwrap();
///
/// assert_eq!(api.method, Method::Get);
/// assert_eq!(api.url(), "https://api.example.com/v1/user");
/// ```
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDescriptor {
    /// Scheme and authority, for example `https://api.example.com`.
    pub host: String,
    /// Request path appended to `host`.
    pub path: String,
    /// HTTP method.
    pub method: Method,
    /// Body encoding for POST requests.
    pub content_type: ContentType,
    /// Call timeout in milliseconds, `<= 0` means the transport default.
    #[serde(rename = "timeout")]
    pub timeout_ms: i64,
    /// Name of the signer to apply, empty for none.
    #[serde(rename = "sign")]
    pub signer: String,
    /// Opaque configuration handed to the signer.
    #[serde(rename = "sign_config")]
    pub signer_config: SignConfig,
    /// Headers sent with every call; per-call headers win on collision.
    #[serde(rename = "header")]
    pub static_headers: Header,
    /// Expected value at `code_path` for a successful call.
    pub success_code: String,
    /// Path selector of the business code.
    #[serde(rename = "code_key")]
    pub code_path: String,
    /// Path selector of the business message.
    #[serde(rename = "message_key")]
    pub message_path: String,
    /// Path selector of the payload returned on success.
    #[serde(rename = "data_key")]
    pub data_path: String,
    /// Return the parsed body untouched instead of extracting fields.
    pub disable_extract: bool,
}

impl ApiDescriptor {
    /// Create a GET descriptor for `host` + `path`.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set signer name and its configuration.
    pub fn with_signer(mut self, name: impl Into<String>, config: SignConfig) -> Self {
        self.signer = name.into();
        self.signer_config = config;
        self
    }

    /// Add a static header.
    pub fn with_static_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_headers.insert(key.into(), value.into());
        self
    }

    /// Configure field extraction.
    pub fn with_extraction(
        mut self,
        success_code: impl Into<String>,
        code_path: impl Into<String>,
        message_path: impl Into<String>,
        data_path: impl Into<String>,
    ) -> Self {
        self.success_code = success_code.into();
        self.code_path = code_path.into();
        self.message_path = message_path.into();
        self.data_path = data_path.into();
        self
    }

    /// Disable or enable field extraction.
    pub fn with_extract_disabled(mut self, disabled: bool) -> Self {
        self.disable_extract = disabled;
        self
    }

    /// The signer to run, if any.
    pub fn signer_name(&self) -> Option<&str> {
        let name = self.signer.trim();
        (!name.is_empty()).then_some(name)
    }

    /// The configured timeout, `None` when the transport default applies.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms as u64))
    }

    /// Full request url: `host` and `path` joined by exactly one `/`.
    pub fn url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            host.to_string()
        } else {
            format!("{host}/{path}")
        }
    }
}

struct RedactConfig<'a>(&'a SignConfig);

impl Debug for RedactConfig<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (k, v) in self.0 {
            match v {
                Value::String(s) => m.entry(k, &Redact::from(s)),
                v => m.entry(k, v),
            };
        }
        m.finish()
    }
}

impl Debug for ApiDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDescriptor")
            .field("host", &self.host)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("timeout_ms", &self.timeout_ms)
            .field("signer", &self.signer)
            .field("signer_config", &RedactConfig(&self.signer_config))
            .field("static_headers", &RedactHeader(&self.static_headers))
            .field("success_code", &self.success_code)
            .field("code_path", &self.code_path)
            .field("message_path", &self.message_path)
            .field("data_path", &self.data_path)
            .field("disable_extract", &self.disable_extract)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("https://a.com", "/v1/x", "https://a.com/v1/x"; "plain")]
    #[test_case("https://a.com/", "/v1/x", "https://a.com/v1/x"; "double slash")]
    #[test_case("https://a.com", "v1/x", "https://a.com/v1/x"; "missing slash")]
    #[test_case("https://a.com", "", "https://a.com"; "empty path")]
    fn test_url(host: &str, path: &str, expected: &str) {
        assert_eq!(ApiDescriptor::new(host, path).url(), expected);
    }

    #[test]
    fn test_timeout() {
        let api = ApiDescriptor::new("http://a", "/");
        assert_eq!(api.timeout(), None);
        assert_eq!(api.clone().with_timeout_ms(-5).timeout(), None);
        assert_eq!(
            api.with_timeout_ms(1500).timeout(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_signer_name() {
        let api = ApiDescriptor::new("http://a", "/");
        assert_eq!(api.signer_name(), None);
        let api = api.with_signer("hmac", SignConfig::new());
        assert_eq!(api.signer_name(), Some("hmac"));
    }

    #[test]
    fn test_deserialize_json() {
        let api: ApiDescriptor = serde_json::from_value(json!({
            "host": "https://api.example.com",
            "path": "/order",
            "method": "post",
            "content_type": "application/json; charset=utf-8",
            "timeout": 3000,
            "sign": "lua_md5",
            "sign_config": {"app_key": "k", "retry": 2},
            "header": {"X-From": "reqcall"},
            "success_code": "0",
            "code_key": "ret",
            "message_key": "msg",
            "data_key": "data.items",
        }))
        .unwrap();

        assert_eq!(api.method, Method::Post);
        assert_eq!(api.content_type, ContentType::Json);
        assert_eq!(api.timeout(), Some(Duration::from_secs(3)));
        assert_eq!(api.signer_name(), Some("lua_md5"));
        assert_eq!(api.signer_config["retry"], json!(2));
        assert_eq!(api.static_headers["X-From"], "reqcall");
        assert_eq!(api.data_path, "data.items");
        assert!(!api.disable_extract);
    }

    #[test]
    fn test_deserialize_toml() {
        let api: ApiDescriptor = toml::from_str(
            r#"
            host = "https://api.example.com"
            path = "/ping"
            disable_extract = true

            [header]
            Accept = "application/json"
            "#,
        )
        .unwrap();

        assert_eq!(api.method, Method::Get);
        assert_eq!(api.content_type, ContentType::Form);
        assert!(api.disable_extract);
        assert_eq!(api.static_headers["Accept"], "application/json");
    }

    #[test]
    fn test_deserialize_rejects_unknown_method() {
        let err = serde_json::from_value::<ApiDescriptor>(json!({"method": "DELETE"}))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported method"));
    }

    #[test]
    fn test_debug_redacts_signer_config() {
        let api = ApiDescriptor::new("http://a", "/").with_signer(
            "hmac",
            json!({"secret": "a-very-long-secret-value"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let output = format!("{api:?}");
        assert!(output.contains("a-v***lue"));
        assert!(!output.contains("a-very-long-secret-value"));
    }

    #[test]
    fn test_debug_redacts_static_headers() {
        let api = ApiDescriptor::new("http://a", "/")
            .with_static_header("Authorization", "Bearer 0123456789abcdef")
            .with_static_header("Accept", "application/json");
        let output = format!("{api:?}");
        assert!(output.contains("Bea***def"));
        assert!(output.contains(r#""Accept": "application/json""#));
        assert!(!output.contains("0123456789abcdef"));
    }
}
