//! HTTP probe target address.

use std::fmt;

use crate::error::{ProbeError, Result};

/// URL scheme accepted for HTTP probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Parses a scheme string; anything other than `http` or `https` is a
    /// construction error.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(ProbeError::InvalidTarget(format!(
                "unsupported scheme `{other}`, expected http or https"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable address of an HTTP health endpoint.
#[derive(Debug, Clone)]
pub struct HttpTarget {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
    headers: Vec<(String, String)>,
}

impl HttpTarget {
    /// Creates a target. The scheme must be `http` or `https` and the port
    /// non-zero; violations are construction errors, not check failures.
    pub fn new(
        scheme: &str,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Result<Self> {
        let scheme = Scheme::parse(scheme)?;
        if port == 0 {
            return Err(ProbeError::InvalidTarget(
                "port must be non-zero".to_string(),
            ));
        }
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Ok(Self {
            scheme,
            host: host.into(),
            port,
            path,
            headers: Vec::new(),
        })
    }

    /// Adds a header sent with every probe request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Full request URL for this target.
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}
