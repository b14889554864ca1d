//! Health check transports.
//!
//! A [`Checker`] performs one check attempt against a server endpoint.
//! Failures are reported as error values so the scheduler can log the
//! cause, but they are check outcomes, not faults: the scheduler folds
//! them into the threshold state machine and never propagates them.
//!
//! Two transports are provided: HTTP GET ([`HttpChecker`], the reference
//! check) and plain TCP connect ([`TcpChecker`]).

use std::time::Duration;

use anyhow::{Context as _, bail};
use tokio::io::AsyncWriteExt as _;
use tokio::net::TcpStream;

use crate::error::{ProbeError, Result};
use crate::target::HttpTarget;

/// A single health check transport.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Performs one check attempt. `Ok(())` means the server is healthy.
    async fn check(&self) -> anyhow::Result<()>;
}

/// HTTP GET checker: succeeds iff the response status is in `[200, 400)`.
///
/// Redirects are not followed (3xx counts as success by itself), and every
/// request carries a `Connection: close` header so short-lived checks do
/// not accumulate kept-alive connections.
pub struct HttpChecker {
    client: reqwest::Client,
    target: HttpTarget,
}

impl HttpChecker {
    pub(crate) fn new(client: reqwest::Client, target: HttpTarget) -> Self {
        Self { client, target }
    }

    /// Builds a client with connect and total timeouts both set to
    /// `timeout`. Client construction failures surface here, at factory
    /// construction time, not inside a check.
    pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ProbeError::Factory(e.into()))
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self) -> anyhow::Result<()> {
        let url = self.target.url();
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::CONNECTION, "close");
        for (name, value) in self.target.headers() {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.with_context(|| format!("GET {url}"))?;
        let status = response.status().as_u16();
        if (200..400).contains(&status) {
            Ok(())
        } else {
            bail!("GET {url} returned status {status}")
        }
    }
}

/// TCP connect checker: succeeds iff a connection can be established.
pub struct TcpChecker {
    host: String,
    port: u16,
}

impl TcpChecker {
    pub(crate) fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

#[async_trait::async_trait]
impl Checker for TcpChecker {
    async fn check(&self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let mut stream = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("connect {addr}"))?;
        stream.shutdown().await?;
        Ok(())
    }
}
