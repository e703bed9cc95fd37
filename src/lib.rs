//! Local Proxy Library
//!
//! A forwarding proxy for chat-completion requests that memoizes upstream
//! responses on disk for a configurable time window.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod upstream;

pub use cache::{CacheKey, CacheStore};
pub use config::ProxyConfig;
pub use dispatcher::{Dispatched, RequestDispatcher, ResponseSource};
pub use upstream::{UpstreamClient, UpstreamError};
