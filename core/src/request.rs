//! Turning a descriptor plus signed payload into an HTTP request.

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE};
use http::HeaderValue;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::utils::to_plain_string;
use crate::{ApiDescriptor, ContentType, Header, Input, Method, Result};

/// Overlay per-call headers on the descriptor's static headers.
///
/// Header names compare case-insensitively; the per-call value wins.
pub fn merge_headers(static_headers: &Header, header: Header) -> Header {
    let mut merged = static_headers.clone();
    for (k, v) in header {
        merged.retain(|existing, _| !existing.eq_ignore_ascii_case(&k));
        merged.insert(k, v);
    }
    merged
}

/// Build the request for `api`.
///
/// - GET: every input value is rendered as a string query parameter.
/// - POST with JSON: the input is the JSON body, values keep their types.
/// - POST otherwise: every input value is a `multipart/form-data` field.
///
/// Parameters are emitted in key order so identical payloads produce
/// identical requests.
pub fn build_request(
    api: &ApiDescriptor,
    input: &Input,
    header: &Header,
) -> Result<http::Request<Bytes>> {
    let mut builder = http::Request::builder().method(http::Method::from(api.method));
    for (k, v) in header {
        builder = builder.header(
            HeaderName::from_bytes(k.as_bytes())?,
            HeaderValue::from_str(v)?,
        );
    }

    let mut url = api.url();
    let body = match (api.method, api.content_type) {
        (Method::Get, _) => {
            let query = encode_query(input);
            if !query.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&query);
            }
            Bytes::new()
        }
        (Method::Post, ContentType::Json) => {
            if !has_header(header, CONTENT_TYPE.as_str()) {
                builder = builder.header(CONTENT_TYPE, ContentType::Json.as_str());
            }
            Bytes::from(serde_json::to_vec(input)?)
        }
        (Method::Post, ContentType::Form) => {
            let boundary = new_boundary();
            let headers = builder.headers_mut();
            if let Some(headers) = headers {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))?,
                );
            }
            Bytes::from(encode_multipart(&boundary, input))
        }
    };

    Ok(builder.uri(url).body(body)?)
}

fn has_header(header: &Header, name: &str) -> bool {
    header.keys().any(|k| k.eq_ignore_ascii_case(name))
}

fn sorted_fields(input: &Input) -> Vec<(&str, String)> {
    let mut fields: Vec<_> = input
        .iter()
        .map(|(k, v)| (k.as_str(), to_plain_string(v)))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
}

fn encode_query(input: &Input) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted_fields(input))
        .finish()
}

fn new_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("reqcall-{suffix}")
}

fn encode_multipart(boundary: &str, input: &Input) -> Vec<u8> {
    let mut body = Vec::new();
    for (k, v) in sorted_fields(input) {
        let name = k
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A");
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(v.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
