//! Utility functions and types.

use serde_json::Value;
use std::fmt::{self, Debug, Formatter};

use crate::Header;

/// Header names whose values never show up in debug or trace output.
pub(crate) const SENSITIVE_HEADERS: &[&str] = &["authorization", "proxy-authorization", "cookie"];

/// Redacts a string by replacing all but the first and last three characters with asterisks.
///
/// - If the input string has fewer than 12 characters, it should be entirely redacted.
/// - If the input string has 12 or more characters, only the first three and the last three.
///
/// This design is to allow users to distinguish between different redacted strings but avoid
/// leaking sensitive information.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let length = self.0.len();
        if length == 0 {
            f.write_str("EMPTY")
        } else if length < 12 || !self.0.is_char_boundary(3) || !self.0.is_char_boundary(length - 3) {
            f.write_str("***")
        } else {
            f.write_str(&self.0[..3])?;
            f.write_str("***")?;
            f.write_str(&self.0[length - 3..])
        }
    }
}

/// Debug view of a header map with keys sorted and credentials redacted.
pub(crate) struct RedactHeader<'a>(pub(crate) &'a Header);

impl Debug for RedactHeader<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.0.keys().collect();
        keys.sort();

        let mut m = f.debug_map();
        for k in keys {
            let v = &self.0[k];
            if SENSITIVE_HEADERS.contains(&k.to_ascii_lowercase().as_str()) {
                m.entry(k, &Redact::from(v));
            } else {
                m.entry(k, v);
            }
        }
        m.finish()
    }
}

/// Render a dynamic value the way it travels in query strings, form fields and
/// response codes.
///
/// - strings are returned as-is,
/// - numbers use their shortest decimal form,
/// - booleans become `true` / `false`,
/// - null becomes the empty string,
/// - arrays and objects are encoded as compact JSON.
pub fn to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
