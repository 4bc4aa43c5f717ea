//! Remote addresses: `ftp://` URL parsing and explicit host/port/path triples.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;
use url::Url;

use super::FetchError;
use super::constants::DEFAULT_FTP_PORT;

/// Maximum URL length accepted by [`Endpoint::parse`].
pub const MAX_URL_LENGTH: usize = 2000;

/// Where a remote resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: Option<u16>,
    path: String,
}

impl Endpoint {
    /// Builds an endpoint from parts. `port = None` means the protocol default.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] for an empty host or port 0.
    pub fn new(
        host: impl Into<String>,
        port: Option<u16>,
        path: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let host = host.into();
        let path = path.into();
        if host.trim().is_empty() {
            return Err(FetchError::invalid_address(
                format!("{host}{path}"),
                "host is empty",
            ));
        }
        if port == Some(0) {
            return Err(FetchError::invalid_address(
                format!("{host}:0{path}"),
                "port must be a positive integer",
            ));
        }
        Ok(Self { host, port, path })
    }

    /// Parses an `ftp://[user@]host[:port]/path` URL.
    ///
    /// The path is percent-decoded. User info in the URL is ignored; use the
    /// request credentials instead.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] if the URL is malformed, too
    /// long, not `ftp`, or has no host.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let trimmed = input.trim();
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(FetchError::invalid_address(
                trimmed.chars().take(50).collect::<String>(),
                format!("URL longer than {MAX_URL_LENGTH} characters"),
            ));
        }

        let url = Url::parse(trimmed).map_err(|e| FetchError::invalid_address(input, e.to_string()))?;
        if url.scheme() != "ftp" {
            return Err(FetchError::invalid_address(
                input,
                format!("scheme '{}' is not supported, use ftp://", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FetchError::invalid_address(input, "URL has no host"))?;

        // `ftp://host` and `ftp://host/` name the server's default resource.
        let raw_path = match url.path() {
            "/" => "",
            path => path,
        };
        let path = match urlencoding::decode(raw_path) {
            Ok(Cow::Borrowed(path)) => path.to_string(),
            Ok(Cow::Owned(path)) => path,
            Err(_) => {
                return Err(FetchError::invalid_address(
                    input,
                    "path is not valid UTF-8 after percent-decoding",
                ));
            }
        };

        let endpoint = Self::new(host, url.port(), path)?;
        debug!(host = %endpoint.host, port = ?endpoint.port, path = %endpoint.path, "parsed FTP URL");
        Ok(endpoint)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if one was given.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Port that will actually be used.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_FTP_PORT)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "ftp://{}:{}{}", self.host, port, self.path),
            None => write!(f, "ftp://{}{}", self.host, self.path),
        }
    }
}
