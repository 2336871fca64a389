//! Core components for calling configured HTTP APIs.
//!
//! This crate provides the foundational types of the reqcall ecosystem: API
//! descriptors, the registries that hold descriptors and signers, the request
//! pipeline and response extraction.
//!
//! ## Overview
//!
//! - **Descriptor**: [`ApiDescriptor`] declares host, path, method, body
//!   encoding, signer and how to read the response of one endpoint.
//! - **Registries**: [`DescriptorRegistry`] and [`SignerRegistry`] map names to
//!   descriptors and signers. Both are instantiable and also exist as
//!   process-wide instances.
//! - **Sign**: the [`Sign`] trait transforms a call's input and headers, for
//!   example to add a signature.
//! - **Context**: pluggable runtime collaborators: transport ([`HttpSend`]),
//!   environment ([`Env`]) and trace sink ([`RecordTrace`]).
//! - **Client**: [`Client`] runs the pipeline: sign, merge headers, shape the
//!   payload, send, check the status and [`extract`] the result.
//!
//! ## Example
//!
//! ```no_run
//! use reqcall_core::{ApiDescriptor, Client, Context, DescriptorRegistry, Header, Input, SignerRegistry};
//! use std::sync::Arc;
//!
//! # async fn example() -> reqcall_core::Result<()> {
//! let apis = Arc::new(DescriptorRegistry::new());
//! apis.register(
//!     "user_info",
//!     ApiDescriptor::new("https://api.example.com", "/v1/user")
//!         .with_signer("token", Default::default())
//!         .with_extraction("0", "ret", "msg", "data"),
//! );
//!
//! let signers = Arc::new(SignerRegistry::new());
//! signers.register_native("token", |input, mut header, _config| {
//!     header.insert("Authorization".to_string(), "Bearer demo".to_string());
//!     Ok((input, header))
//! });
//!
//! // Configure a transport with `Context::with_http_send`.
//! let client = Client::new(Context::new())
//!     .with_descriptors(apis)
//!     .with_signers(signers);
//!
//! let resp = client
//!     .execute_by_name("user_info", Input::new(), Header::new())
//!     .await?;
//! println!("{:?}", resp.data());
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`select`]: dotted/indexed path selection over JSON.
//! - [`utils`]: redaction and value rendering helpers.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};

mod context;
pub use context::{Context, Env, HttpSend, NoopEnv, NoopHttpSend, OsEnv, RemoteAddr, StaticEnv};

mod trace;
pub use trace::{LogRecordTrace, NoopRecordTrace, RecordTrace, TraceOutcome, TraceRecord};

mod descriptor;
pub use descriptor::{ApiDescriptor, ContentType, Method};

mod registry;
pub use registry::DescriptorRegistry;

mod sign;
pub use sign::{Header, Input, NativeSigner, Sign, SignConfig, SignerInfo, SignerRegistry};

mod path;
pub use path::select;

mod extract;
pub use extract::{extract, ApiResponse};

mod request;
pub use request::{build_request, merge_headers};

mod client;
pub use client::Client;
