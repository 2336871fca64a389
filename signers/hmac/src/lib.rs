//! HMAC parameter signer for reqcall.
//!
//! ```
//! use reqcall_core::{ApiDescriptor, SignerRegistry};
//! use reqcall_hmac::HmacSigner;
//! use serde_json::json;
//!
//! let signers = SignerRegistry::new();
//! signers.register("hmac", HmacSigner::new());
//!
//! let config = json!({"secret": "s3cr3t", "timestamp_field": "ts"});
//! let api = ApiDescriptor::new("https://api.example.com", "/v1/order")
//!     .with_signer("hmac", config.as_object().cloned().unwrap_or_default());
//! assert_eq!(api.signer_name(), Some("hmac"));
//! ```

mod config;
pub use config::{Algorithm, Config, Encoding, Location};

mod hash;

mod signer;
pub use signer::{string_to_sign, HmacSigner};
