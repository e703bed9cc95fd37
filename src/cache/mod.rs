//! Cache module for memoizing upstream responses on disk
//!
//! This module provides a store that persists responses to the filesystem,
//! one file per message, with a store-wide TTL. Expired or unreadable entries
//! are reported as absent so callers fall through to the upstream API.

mod key;
mod manager;

pub use key::{decode_file_stem, CacheKey};
pub use manager::{CacheError, CacheRecord, CacheStore};
