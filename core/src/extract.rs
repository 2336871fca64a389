use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::path::select;
use crate::utils::to_plain_string;
use crate::ApiDescriptor;

/// ApiResponse is the structured result of one call.
///
/// Which variant is produced is decided by the descriptor's
/// `disable_extract` flag, never by the response itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Fields selected from the body by the descriptor's paths.
    Extracted {
        /// Rendered value at `code_path`.
        code: String,
        /// Rendered value at `message_path`.
        message: String,
        /// Value at `data_path` on success, `None` on failure or when absent.
        data: Option<Value>,
        /// Whether `code` differs from `success_code`.
        error: bool,
    },
    /// The whole body, used when extraction is disabled.
    Raw {
        /// HTTP status code, as a string.
        code: String,
        /// Canonical reason of the HTTP status.
        message: String,
        /// Body parsed as JSON, or the body text when it is not JSON.
        data: Value,
        /// HTTP status code.
        http_status: u16,
    },
}

impl ApiResponse {
    /// The business code, or the HTTP status code for raw responses.
    pub fn code(&self) -> &str {
        match self {
            ApiResponse::Extracted { code, .. } | ApiResponse::Raw { code, .. } => code,
        }
    }

    /// The business message, or the HTTP status reason for raw responses.
    pub fn message(&self) -> &str {
        match self {
            ApiResponse::Extracted { message, .. } | ApiResponse::Raw { message, .. } => message,
        }
    }

    /// The payload, if any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiResponse::Extracted { data, .. } => data.as_ref(),
            ApiResponse::Raw { data, .. } => Some(data),
        }
    }

    /// Whether the remote reported a business failure. Always false for raw responses.
    pub fn is_error(&self) -> bool {
        match self {
            ApiResponse::Extracted { error, .. } => *error,
            ApiResponse::Raw { .. } => false,
        }
    }
}

/// Turn a response into an [`ApiResponse`] following `api`'s extraction settings.
///
/// Extraction never fails: a body that is not JSON is kept as text when
/// extraction is disabled, and behaves like an empty document otherwise.
pub fn extract(api: &ApiDescriptor, resp: &http::Response<Bytes>) -> ApiResponse {
    let body = resp.body();

    if api.disable_extract {
        let data = serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
        let status = resp.status();
        return ApiResponse::Raw {
            code: status.as_str().to_string(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            data,
            http_status: status.as_u16(),
        };
    }

    let doc: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let code = select(&doc, &api.code_path)
        .map(to_plain_string)
        .unwrap_or_default();
    let message = select(&doc, &api.message_path)
        .map(to_plain_string)
        .unwrap_or_default();

    if code != api.success_code {
        return ApiResponse::Extracted {
            code,
            message,
            data: None,
            error: true,
        };
    }

    ApiResponse::Extracted {
        code,
        message,
        data: select(&doc, &api.data_path).cloned(),
        error: false,
    }
}
