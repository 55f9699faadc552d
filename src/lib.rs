//! # proxyvet-rs
//!
//! Verifies whether a candidate network proxy is usable and genuinely
//! anonymous. The checker issues a GET *through* the proxy against a
//! third-party "what is my IP" service, inspects the body, and classifies
//! the proxy as anonymous, leaking the operator's real address, or failed.
//!
//! Failures carry a [`CheckError::kind`] so the surrounding pool can tell a
//! transient infrastructure hiccup (requeue the proxy) from a permanent
//! disqualification (drop it). The checker itself never retries.
//!
//! Two strategies ship out of the box, selectable at runtime:
//!
//! - `"simple"` (default): one probe picked at random from a pool of
//!   bare-IP echo services.
//! - `"twopass"`: the simple check followed, on success, by a probe
//!   against a header-echo service that catches proxies hiding the IP but
//!   still forwarding `X-Forwarded-For`-style headers.
//!
//! ## Example
//!
//! ```no_run
//! use proxyvet_rs::{Checker, ProxyUrl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = Checker::new().await?;
//!     let proxy = ProxyUrl::new("socks5://203.0.113.10:1080")?;
//!     match checker.check(&proxy).await {
//!         Ok(latency) => println!("anonymous, answered in {latency:?}"),
//!         Err(err) if err.is_transient() => println!("retry later: {err}"),
//!         Err(err) => println!("disqualified: {err}"),
//!     }
//!     Ok(())
//! }
//! ```

mod checker;
mod classify;
mod config;
mod error;
mod probe;
mod proxy;
mod sites;
mod strategy;
mod user_agents;

pub use crate::checker::Checker;
pub use crate::config::CheckerConfig;
pub use crate::error::{CheckError, ErrorKind};
pub use crate::proxy::{Direct, ProxyHandle, ProxyUrl};
pub use crate::strategy::Check;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
