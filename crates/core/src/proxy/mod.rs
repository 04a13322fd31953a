//! Proxy pool manager.
//!
//! Hands out outbound proxies round-robin and tracks their health from the
//! outcomes fetchers report back. Pool entries are private; callers only see
//! [`ProxyLease`]s.

mod config;
mod pool;
mod types;

pub use config::ProxyPoolConfig;
pub use pool::ProxyPool;
pub use types::{ProxyEndpoint, ProxyError, ProxyHealth, ProxyLease, ProxyOutcome, ProxyStatus};
