//! Fetch entry points.
//!
//! A [`FetchRequest`] holds a frozen [`FetchConfiguration`] plus the
//! collaborators of a fetch (connector, event sink, progress listener). The
//! `from_*` methods address a remote file and run the attempt pipeline under
//! the retry policy:
//!
//! ```text
//! connect → login → transfer mode → size → buffer → copy → logout → disconnect
//! ```
//!
//! Network failures never surface as errors from the `from_*` methods; they
//! yield `Ok(None)` and are reported through the event sink. Use
//! [`FetchRequest::try_fetch`] to get the failure itself.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::buffer::known_size;
use super::config::{Credentials, FetchConfiguration, TransferModePolicy};
use super::events::{EventSink, FetchEvent, Step, TracingSink};
use super::progress::ProgressState;
use super::resource::Resource;
use super::retry::{FetchFailure, classify_error, run_with_retry};
use super::session::Session;
use super::{Endpoint, FetchError};
use crate::transport::{Connector, FtpConnector};

/// Callback receiving every progress tick of a transfer.
pub type ProgressListener = Arc<dyn Fn(&ProgressState) + Send + Sync>;

/// A configured fetch, ready to be pointed at a remote file.
#[derive(Clone)]
pub struct FetchRequest {
    config: FetchConfiguration,
    connector: Option<Arc<dyn Connector>>,
    sink: Arc<dyn EventSink>,
    progress: Option<ProgressListener>,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            config: FetchConfiguration::default(),
            connector: None,
            sink: Arc::new(TracingSink),
            progress: None,
        }
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("config", &self.config)
            .field("custom_connector", &self.connector.is_some())
            .field("progress_listener", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl FetchRequest {
    /// Request with default configuration, the FTP connector and tracing output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_configuration(mut self, config: FetchConfiguration) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.config = self.config.with_credentials(credentials);
        self
    }

    #[must_use]
    pub fn with_anonymous_credentials(self) -> Self {
        self.with_credentials(Credentials::anonymous())
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.config = self.config.with_username(username);
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.config = self.config.with_password(password);
        self
    }

    #[must_use]
    pub fn with_transfer_mode(mut self, transfer_mode: TransferModePolicy) -> Self {
        self.config = self.config.with_transfer_mode(transfer_mode);
        self
    }

    #[must_use]
    pub fn with_passive_mode(mut self, passive_mode: bool) -> Self {
        self.config = self.config.with_passive_mode(passive_mode);
        self
    }

    /// Total number of attempts, at least 1.
    #[must_use]
    pub fn with_max_retries(mut self, max_attempts: u32) -> Self {
        self.config = self.config.with_max_retries(max_attempts);
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config = self.config.with_retry_delay(retry_delay);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(connect_timeout);
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.config = self.config.with_read_timeout(read_timeout);
        self
    }

    /// Replaces the transport factory. Defaults to [`FtpConnector`] built
    /// from the configured timeouts.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_progress_listener(
        mut self,
        listener: impl Fn(&ProgressState) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn configuration(&self) -> &FetchConfiguration {
        &self.config
    }

    /// Fetches the file named by an `ftp://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] for a malformed URL, before any
    /// connection is made. Every other failure yields `Ok(None)`.
    pub async fn from_url(&self, url: &str) -> Result<Option<Resource>, FetchError> {
        let endpoint = Endpoint::parse(url)?;
        Ok(self.fetch(&endpoint).await)
    }

    /// Fetches `path` from `host` on the default port.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] for an empty host.
    pub async fn from_host_path(
        &self,
        host: &str,
        path: &str,
    ) -> Result<Option<Resource>, FetchError> {
        let endpoint = Endpoint::new(host, None, path)?;
        Ok(self.fetch(&endpoint).await)
    }

    /// Fetches `path` from `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] for an empty host or port 0.
    pub async fn from_host_port_path(
        &self,
        host: &str,
        port: u16,
        path: &str,
    ) -> Result<Option<Resource>, FetchError> {
        let endpoint = Endpoint::new(host, Some(port), path)?;
        Ok(self.fetch(&endpoint).await)
    }

    /// Fetches the server's default resource (empty path) from `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidAddress`] for an empty host or port 0.
    pub async fn from_host_port(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<Resource>, FetchError> {
        self.from_host_port_path(host, port, "").await
    }

    /// Fetches `endpoint`, collapsing any failure into `None`.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Option<Resource> {
        self.try_fetch(endpoint).await.ok()
    }

    /// Fetches `endpoint` under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error and how many attempts ran.
    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    pub async fn try_fetch(&self, endpoint: &Endpoint) -> Result<Resource, FetchFailure> {
        let policy = self.config.retry_policy();
        let default_connector;
        let connector: &dyn Connector = match &self.connector {
            Some(connector) => connector.as_ref(),
            None => {
                default_connector =
                    FtpConnector::new(self.config.connect_timeout(), self.config.read_timeout());
                &default_connector
            }
        };

        let outcome = run_with_retry(&policy, self.sink.as_ref(), move |attempt| {
            self.attempt(connector, endpoint, attempt)
        })
        .await;

        match &outcome {
            Ok((resource, attempts)) => self.sink.emit(&FetchEvent::Finished {
                success: true,
                attempts: *attempts,
                bytes: Some(resource.len() as u64),
            }),
            Err(failure) => self.sink.emit(&FetchEvent::Finished {
                success: false,
                attempts: failure.attempts,
                bytes: None,
            }),
        }
        outcome.map(|(resource, _)| resource)
    }

    /// One attempt: a whole session from connect to disconnect.
    ///
    /// After a connect failure only the sockets are closed. After any other
    /// failure the remaining transfer steps are skipped but logout and
    /// disconnect still run. The first failure is the attempt's error.
    #[instrument(skip(self, connector, endpoint))]
    async fn attempt(
        &self,
        connector: &dyn Connector,
        endpoint: &Endpoint,
        attempt: u32,
    ) -> Result<(Resource, u32), FetchError> {
        let mut session = Session::new(connector.new_transport(), endpoint, self.sink.as_ref());

        if let Err(error) = session.open().await {
            self.step_failed(Step::Connect, &error);
            session.disconnect().await;
            return Err(error);
        }

        let transferred = self.transfer(&mut session).await;
        let closed = session.close().await;
        if let Err(error) = &closed {
            self.step_failed(Step::Logout, error);
        }

        let data = transferred?;
        closed?;
        Ok((Resource::new(data), attempt))
    }

    async fn transfer(&self, session: &mut Session<'_>) -> Result<Vec<u8>, FetchError> {
        session
            .authenticate(self.config.credentials())
            .await
            .inspect_err(|error| self.step_failed(Step::Login, error))?;
        session
            .configure(self.config.transfer_mode(), self.config.passive_mode())
            .await
            .inspect_err(|error| self.step_failed(Step::Configure, error))?;

        let estimate = session.estimate_size().await;
        session
            .retrieve(
                estimate.buffer_size,
                known_size(estimate.size),
                self.config.read_timeout(),
                |state| {
                    if let Some(listener) = &self.progress {
                        listener(state);
                    }
                },
            )
            .await
            .inspect_err(|error| self.step_failed(Step::Transfer, error))
    }

    fn step_failed(&self, step: Step, error: &FetchError) {
        self.sink.emit(&FetchEvent::StepFailed {
            step,
            kind: classify_error(error),
            error: error.to_string(),
        });
    }
}
