//! Cache key derivation and filesystem-safe encoding
//!
//! A key is the outgoing message text. On disk it is named by the URL-safe
//! base64 form of its bytes, or by a SHA-256 digest when that form would make
//! an unreasonably long file name.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

/// Longest base64 file stem used before switching to a digest name
const MAX_ENCODED_LEN: usize = 200;

/// Prefix for digest-named files; `.` is outside the base64url alphabet
const DIGEST_PREFIX: &str = "h.";

/// Lookup key for a cached response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for an outgoing message
    pub fn from_message(message: &str) -> Self {
        Self(message.to_string())
    }

    /// The raw key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the file stem this key is stored under
    ///
    /// Short keys map to their reversible base64url encoding. Keys whose
    /// encoding exceeds 200 characters map to `h.<sha256 hex>`; the stored
    /// record carries the original key so a digest collision reads as a miss.
    pub fn file_stem(&self) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(self.0.as_bytes());
        if encoded.len() <= MAX_ENCODED_LEN {
            return encoded;
        }

        format!("{}{}", DIGEST_PREFIX, self.digest_hex())
    }

    /// Short identifier for log lines; reveals nothing of the message text
    pub fn log_id(&self) -> String {
        self.digest_hex().chars().take(12).collect()
    }

    fn digest_hex(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recovers the original key from a base64url file stem
///
/// Returns `None` for digest-named stems and for stems that are not valid
/// base64url or do not decode to UTF-8.
pub fn decode_file_stem(stem: &str) -> Option<CacheKey> {
    if stem.starts_with(DIGEST_PREFIX) {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
    String::from_utf8(bytes).ok().map(CacheKey)
}
