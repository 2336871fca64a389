//! Hash related utils.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::config::{Algorithm, Encoding};

/// HMAC of `content` keyed by `key`.
pub fn hmac(algorithm: Algorithm, key: &[u8], content: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so `new_from_slice` cannot fail.
    match algorithm {
        Algorithm::Sha256 => {
            let mut h = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
            h.update(content);
            h.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha1 => {
            let mut h = Hmac::<Sha1>::new_from_slice(key).expect("hmac accepts any key length");
            h.update(content);
            h.finalize().into_bytes().to_vec()
        }
    }
}

/// Render a digest as text.
pub fn encode(encoding: Encoding, digest: &[u8]) -> String {
    match encoding {
        Encoding::Hex => hex::encode(digest),
        Encoding::Base64 => BASE64_STANDARD.encode(digest),
    }
}
