//! Checker construction, configuration, and dispatch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{CheckerConfig, DEFAULT_STRATEGY, DEFAULT_TIMEOUT};
use crate::error::CheckError;
use crate::probe::{HttpSettings, SiteProbe};
use crate::proxy::ProxyHandle;
use crate::sites::{FIRST_PASS, OPERATOR_IP_URL, SECOND_PASS};
use crate::strategy::{Check, Federated, Strategy, TwoPass};

/// Process-wide entry point. Construct once, share behind an [`Arc`], and
/// call [`Checker::check`] from as many concurrent tasks as needed.
pub struct Checker {
    operator_ip: String,
    settings: Arc<HttpSettings>,
    strategies: HashMap<&'static str, Strategy>,
    active: RwLock<String>,
}

impl Checker {
    /// Resolve the operator's external IP and build the strategy registry.
    ///
    /// The lookup goes out directly, not through any proxy. Every leak
    /// check compares response bodies against this address, so a failure
    /// here is fatal to startup.
    pub async fn new() -> Result<Self, CheckError> {
        let operator_ip = resolve_operator_ip().await?;
        log::info!("operator ip resolved: {operator_ip}");
        Ok(Self::with_operator_ip(operator_ip))
    }

    /// Build a checker around an already-known operator IP, for callers
    /// that resolve the address through their own channel.
    pub fn with_operator_ip(operator_ip: impl Into<String>) -> Self {
        let operator_ip = operator_ip.into();
        let settings = Arc::new(HttpSettings::new(DEFAULT_TIMEOUT));

        let first_pass = || {
            Federated::new(
                FIRST_PASS
                    .iter()
                    .map(|target| SiteProbe::new(target, "", &operator_ip, settings.clone()))
                    .collect(),
            )
        };
        let second_pass = Federated::new(
            SECOND_PASS
                .iter()
                .map(|(target, marker)| {
                    SiteProbe::new(target, marker, &operator_ip, settings.clone())
                })
                .collect(),
        );

        let mut strategies = HashMap::new();
        strategies.insert("simple", Strategy::Simple(first_pass()));
        strategies.insert(
            "twopass",
            Strategy::TwoPass(TwoPass::new(first_pass(), second_pass)),
        );

        Self {
            operator_ip,
            settings,
            strategies,
            active: RwLock::new(DEFAULT_STRATEGY.to_string()),
        }
    }

    /// The external IP every leak check compares against.
    pub fn operator_ip(&self) -> &str {
        &self.operator_ip
    }

    /// Apply a new configuration.
    ///
    /// Takes effect for checks started after this call returns; checks
    /// already in flight keep the settings they started with. An unknown
    /// strategy name is rejected outright.
    pub fn configure(&self, config: &CheckerConfig) -> Result<(), CheckError> {
        if !self.strategies.contains_key(config.strategy.as_str()) {
            return Err(CheckError::UnknownStrategy {
                name: config.strategy.clone(),
            });
        }
        *self.active.write().expect("strategy lock poisoned") = config.strategy.clone();
        self.settings.set_timeout(config.timeout);
        log::info!(
            "checker reconfigured: strategy={} timeout={:?}",
            config.strategy,
            config.timeout
        );
        Ok(())
    }

    /// Vet one proxy with the active strategy. On success the returned
    /// duration is the proxy's observed latency for this check.
    pub async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError> {
        let active = self
            .active
            .read()
            .expect("strategy lock poisoned")
            .clone();
        let strategy = self
            .strategies
            .get(active.as_str())
            .expect("active strategy missing from registry");
        strategy.check(proxy).await
    }
}

#[async_trait]
impl Check for Checker {
    async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError> {
        Checker::check(self, proxy).await
    }
}

async fn resolve_operator_ip() -> Result<String, CheckError> {
    let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
    let body = client.get(OPERATOR_IP_URL).send().await?.text().await?;
    parse_operator_ip(&body)
}

/// First line of the echo body. An empty line is rejected: every leak check
/// substring-matches against this address, and an empty needle would flag
/// every proxy as leaking.
fn parse_operator_ip(body: &str) -> Result<String, CheckError> {
    let ip = body.lines().next().unwrap_or_default().trim();
    if ip.is_empty() {
        return Err(CheckError::EmptyOperatorIp);
    }
    Ok(ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_both_strategies() {
        let checker = Checker::with_operator_ip("198.51.100.7");
        assert!(checker.strategies.contains_key("simple"));
        assert!(checker.strategies.contains_key("twopass"));
        assert_eq!(checker.operator_ip(), "198.51.100.7");
        assert_eq!(*checker.active.read().unwrap(), "simple");
    }

    #[test]
    fn configure_switches_strategy_and_timeout() {
        let checker = Checker::with_operator_ip("198.51.100.7");
        let config = CheckerConfig::default()
            .with_strategy("twopass")
            .with_timeout(Duration::from_secs(2));

        checker.configure(&config).unwrap();
        assert_eq!(*checker.active.read().unwrap(), "twopass");
        assert_eq!(checker.settings.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn operator_ip_parsing_takes_the_first_line() {
        assert_eq!(
            parse_operator_ip("198.51.100.7\nextra noise\n").unwrap(),
            "198.51.100.7"
        );
        assert_eq!(parse_operator_ip("  198.51.100.7  ").unwrap(), "198.51.100.7");
    }

    #[test]
    fn empty_operator_ip_body_is_fatal() {
        for body in ["", "\n", "   \n"] {
            let err = parse_operator_ip(body).unwrap_err();
            assert!(matches!(err, CheckError::EmptyOperatorIp), "body {body:?}");
        }
    }

    #[test]
    fn configure_rejects_unknown_strategy() {
        let checker = Checker::with_operator_ip("198.51.100.7");
        let before = checker.settings.timeout();

        let config = CheckerConfig::default().with_strategy("threeway");
        let err = checker.configure(&config).unwrap_err();
        assert!(matches!(err, CheckError::UnknownStrategy { ref name } if name == "threeway"));

        // A rejected config must leave the previous one fully in place.
        assert_eq!(*checker.active.read().unwrap(), "simple");
        assert_eq!(checker.settings.timeout(), before);
    }
}
