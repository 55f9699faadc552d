//! A single echo-site probe issued through a candidate proxy.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use url::Url;

use crate::classify;
use crate::error::CheckError;
use crate::proxy::ProxyHandle;
use crate::strategy::Check;
use crate::user_agents;

/// Settings shared by every probe and updated live by the checker. A probe
/// reads them once at the start of each check, so a reconfiguration never
/// touches a check already in flight.
#[derive(Debug)]
pub(crate) struct HttpSettings {
    timeout: RwLock<Duration>,
}

impl HttpSettings {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout: RwLock::new(timeout),
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        *self.timeout.read().expect("timeout lock poisoned")
    }

    pub(crate) fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().expect("timeout lock poisoned") = timeout;
    }
}

/// One GET against one echo site.
///
/// The probe attaches a freshly randomized `User-Agent` each call, sends
/// through the supplied proxy, and classifies the body. Dropping the
/// returned future aborts the in-flight request.
pub(crate) struct SiteProbe {
    target: Url,
    /// Marker a well-formed response must contain; empty means the body
    /// must be exactly one bare IPv4 address.
    expect: String,
    operator_ip: String,
    settings: Arc<HttpSettings>,
}

impl SiteProbe {
    pub(crate) fn new(
        target: &str,
        expect: &str,
        operator_ip: &str,
        settings: Arc<HttpSettings>,
    ) -> Self {
        Self {
            target: Url::parse(target).expect("invalid probe target url"),
            expect: expect.to_string(),
            operator_ip: operator_ip.to_string(),
            settings,
        }
    }

    // Fresh client per check: reqwest fixes proxy routing at client
    // construction, and a pooled connection reused across checks could pin
    // one proxy's identity onto another's measurement.
    fn client(&self, proxy: &dyn ProxyHandle, timeout: Duration) -> Result<Client, CheckError> {
        let builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0);
        Ok(proxy.route(builder)?.build()?)
    }
}

#[async_trait]
impl Check for SiteProbe {
    /// Returns the elapsed wall-clock time from just before the request to
    /// just after validation, meaningful only on success.
    async fn check(&self, proxy: &dyn ProxyHandle) -> Result<Duration, CheckError> {
        let start = Instant::now();
        let client = self.client(proxy, self.settings.timeout())?;
        let response = client
            .get(self.target.clone())
            .header(USER_AGENT, user_agents::random())
            .send()
            .await?;
        let body = response.text().await?;
        classify::validate(&body, &self.expect, &self.operator_ip).map_err(|err| {
            log::debug!("{} via {}: {}", self.target, proxy.label(), err);
            err
        })?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::Direct;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OPERATOR_IP: &str = "198.51.100.7";

    fn settings(timeout: Duration) -> Arc<HttpSettings> {
        Arc::new(HttpSettings::new(timeout))
    }

    /// Serve one canned plain-text response on a random local port,
    /// optionally delaying the reply.
    async fn serve_once(body: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn accepts_bare_ip_echo() {
        let url = serve_once("203.0.113.5\n", Duration::ZERO).await;
        let probe = SiteProbe::new(&url, "", OPERATOR_IP, settings(Duration::from_secs(5)));
        let elapsed = probe.check(&Direct).await.expect("probe should pass");
        assert!(elapsed > Duration::ZERO);
    }

    #[tokio::test]
    async fn flags_leaked_operator_ip() {
        let url = serve_once("198.51.100.7\n", Duration::ZERO).await;
        let probe = SiteProbe::new(&url, "", OPERATOR_IP, settings(Duration::from_secs(5)));
        let err = probe.check(&Direct).await.unwrap_err();
        assert!(matches!(err, CheckError::NotAnonymous));
    }

    #[tokio::test]
    async fn marker_probe_accepts_header_echo() {
        let url = serve_once(
            "{\"ifconfig_hostname\":\"proxy.example.net\"}",
            Duration::ZERO,
        )
        .await;
        let probe = SiteProbe::new(
            &url,
            "ifconfig_hostname",
            OPERATOR_IP,
            settings(Duration::from_secs(5)),
        );
        assert!(probe.check(&Direct).await.is_ok());
    }

    #[tokio::test]
    async fn connection_refused_surfaces_as_http_error() {
        // Bind then drop to get a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/");
        let probe = SiteProbe::new(&url, "", OPERATOR_IP, settings(Duration::from_secs(5)));
        let err = probe.check(&Direct).await.unwrap_err();
        assert!(matches!(err, CheckError::Http(_)));
    }

    #[tokio::test]
    async fn inflight_check_keeps_the_timeout_it_started_with() {
        let shared = settings(Duration::from_secs(5));
        let url = serve_once("203.0.113.5\n", Duration::from_millis(200)).await;
        let probe = Arc::new(SiteProbe::new(&url, "", OPERATOR_IP, shared.clone()));

        let task = tokio::spawn({
            let probe = probe.clone();
            async move { probe.check(&Direct).await }
        });

        // Shrink the timeout below the server's delay while the check is
        // already waiting on the response.
        tokio::time::sleep(Duration::from_millis(50)).await;
        shared.set_timeout(Duration::from_millis(50));

        let elapsed = task
            .await
            .unwrap()
            .expect("in-flight check must keep the timeout it started with");
        assert!(elapsed >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn lowered_timeout_applies_to_the_next_check() {
        let shared = settings(Duration::from_secs(5));
        shared.set_timeout(Duration::from_millis(50));

        let url = serve_once("203.0.113.5\n", Duration::from_millis(500)).await;
        let probe = SiteProbe::new(&url, "", OPERATOR_IP, shared);
        let err = probe.check(&Direct).await.unwrap_err();
        assert!(err.is_transient(), "timeout should classify transient: {err}");
    }
}
