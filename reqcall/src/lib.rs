#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use reqcall_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::{default_context, DefaultContext};

#[cfg(feature = "lua")]
pub mod lua {
    pub use reqcall_lua::*;
}

#[cfg(feature = "hmac")]
pub mod hmac {
    pub use reqcall_hmac::*;
}
