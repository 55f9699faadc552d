//! Check strategies composed from site probes.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::CheckError;
use crate::probe::SiteProbe;
use crate::proxy::ProxyHandle;

/// Anything that can vet one proxy and report its observed latency.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError>;
}

/// Spreads checks uniformly at random across a pool of interchangeable
/// probes so no single echo service absorbs the whole query load.
pub(crate) struct Federated<P> {
    probes: Vec<P>,
}

impl<P> Federated<P> {
    pub(crate) fn new(probes: Vec<P>) -> Self {
        assert!(!probes.is_empty(), "federated pool must not be empty");
        Self { probes }
    }

    fn pick_index(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(0..self.probes.len())
    }
}

#[async_trait]
impl<P: Check> Check for Federated<P> {
    async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError> {
        let choice = self.pick_index(&mut rand::thread_rng());
        self.probes[choice].check(proxy).await
    }
}

/// Two-phase strategy: a bare-IP check first, then a header-echo check that
/// catches proxies hiding the IP while still forwarding identifying headers.
///
/// Transient failures propagate unchanged so the caller can requeue; any
/// other failure is wrapped with the phase it came from. Phase 2 runs only
/// after phase 1 succeeds.
pub(crate) struct TwoPass<P> {
    first: Federated<P>,
    second: Federated<P>,
}

impl<P> TwoPass<P> {
    pub(crate) fn new(first: Federated<P>, second: Federated<P>) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<P: Check> Check for TwoPass<P> {
    async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError> {
        if let Err(err) = self.first.check(proxy).await {
            if err.is_transient() {
                return Err(err);
            }
            return Err(err.in_phase("first"));
        }
        // The reported latency is the second pass's alone; the first
        // pass's cost is discarded.
        match self.second.check(proxy).await {
            Ok(elapsed) => Ok(elapsed),
            Err(err) if err.is_transient() => Err(err),
            Err(err) => Err(err.in_phase("second")),
        }
    }
}

/// Closed set of strategies the checker can dispatch to.
pub(crate) enum Strategy {
    Simple(Federated<SiteProbe>),
    TwoPass(TwoPass<SiteProbe>),
}

impl Strategy {
    pub(crate) async fn check(
        &self,
        proxy: &dyn ProxyHandle,
    ) -> Result<Duration, CheckError> {
        match self {
            Strategy::Simple(federated) => federated.check(proxy).await,
            Strategy::TwoPass(two_pass) => two_pass.check(proxy).await,
        }
    }
}
