//! One connect/authenticate/configure/transfer/close lifecycle.
//!
//! [`Session`] drives a [`Transport`] through the steps of a single attempt
//! and emits a [`FetchEvent`] carrying the server reply after each one. It
//! does not decide what happens after a failed step; that is up to the
//! caller, which must still call [`Session::close`].

use std::time::Duration;

use tracing::instrument;

use super::buffer::{derive_buffer_size, estimate_size};
use super::config::{Credentials, TransferModePolicy};
use super::events::{EventSink, FetchEvent};
use super::progress::{CopyOptions, ProgressState, copy_with_progress};
use super::{Endpoint, FetchError};
use crate::transport::{Transport, TransferType};

/// Result of the size query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    /// Listed size, `-1` when unknown.
    pub size: i64,
    /// Read chunk size derived from `size`.
    pub buffer_size: usize,
}

/// A single session against one endpoint.
pub struct Session<'a> {
    transport: Box<dyn Transport>,
    endpoint: &'a Endpoint,
    sink: &'a dyn EventSink,
    transfer_type: TransferType,
}

impl<'a> Session<'a> {
    #[must_use]
    pub fn new(
        transport: Box<dyn Transport>,
        endpoint: &'a Endpoint,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            transport,
            endpoint,
            sink,
            transfer_type: TransferType::Binary,
        }
    }

    /// Connects to the endpoint's host, on its port or the protocol default.
    ///
    /// # Errors
    ///
    /// Returns the transport's connect error.
    #[instrument(skip(self), fields(host = %self.endpoint.host()))]
    pub async fn open(&mut self) -> Result<(), FetchError> {
        self.transport
            .connect(self.endpoint.host(), self.endpoint.port())
            .await?;
        self.sink.emit(&FetchEvent::Connected {
            host: self.endpoint.host().to_string(),
            port: self.endpoint.effective_port(),
            reply: self.transport.last_reply(),
        });
        Ok(())
    }

    /// Logs in.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Authentication`] when the server rejects the login.
    #[instrument(skip_all, fields(user = %credentials.username()))]
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), FetchError> {
        self.transport
            .login(credentials.username(), credentials.password())
            .await?;
        self.sink.emit(&FetchEvent::LoggedIn {
            user: credentials.username().to_string(),
            reply: self.transport.last_reply(),
        });
        Ok(())
    }

    /// Resolves the transfer type for the endpoint path and applies it along
    /// with stream mode and the data channel mode.
    ///
    /// # Errors
    ///
    /// Returns the first rejected setup command.
    #[instrument(skip(self))]
    pub async fn configure(
        &mut self,
        policy: TransferModePolicy,
        passive: bool,
    ) -> Result<TransferType, FetchError> {
        let transfer_type = policy.resolve(self.endpoint.path());
        self.transport.set_transfer_type(transfer_type).await?;
        self.transport.set_stream_mode().await?;
        self.transport.set_passive_mode(passive);
        self.transfer_type = transfer_type;
        self.sink.emit(&FetchEvent::TransferModeSet {
            transfer_type,
            passive,
            reply: self.transport.last_reply(),
        });
        Ok(transfer_type)
    }

    /// Looks up the remote size and derives the read buffer size from it.
    pub async fn estimate_size(&mut self) -> SizeEstimate {
        let size = estimate_size(self.transport.as_mut(), self.endpoint.path()).await;
        let estimate = SizeEstimate {
            size,
            buffer_size: derive_buffer_size(size),
        };
        self.sink.emit(&FetchEvent::SizeEstimated {
            path: self.endpoint.path().to_string(),
            size: estimate.size,
            buffer_size: estimate.buffer_size,
        });
        estimate
    }

    /// Streams the remote file into memory.
    ///
    /// Every progress tick goes to the sink and then to `on_progress`.
    /// In ASCII mode the network CRLF line endings are turned into `\n`.
    /// The initial buffer never exceeds `buffer_size`, whatever size the
    /// server listed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] if the server refuses the file,
    /// [`FetchError::Timeout`] if a read stalls past `read_timeout`, and
    /// [`FetchError::Transfer`] if the stream breaks.
    #[instrument(skip(self, on_progress), fields(path = %self.endpoint.path()))]
    pub async fn retrieve<F>(
        &mut self,
        buffer_size: usize,
        total_bytes: Option<u64>,
        read_timeout: Duration,
        mut on_progress: F,
    ) -> Result<Vec<u8>, FetchError>
    where
        F: FnMut(&ProgressState),
    {
        let path = self.endpoint.path().to_string();
        let mut stream = self.transport.open_read_stream(&path).await?;
        self.sink.emit(&FetchEvent::TransferStarted {
            path: path.clone(),
            reply: self.transport.last_reply(),
        });

        let initial = total_bytes.map_or(buffer_size, |total| {
            usize::try_from(total).map_or(buffer_size, |total| total.min(buffer_size))
        });
        let mut data = Vec::with_capacity(initial);
        let options = CopyOptions::new(buffer_size, total_bytes).with_read_timeout(read_timeout);
        let sink = self.sink;
        let copied = copy_with_progress(&mut stream, &mut data, &options, |state| {
            sink.emit(&FetchEvent::Progress(state));
            on_progress(&state);
        })
        .await
        .map_err(|error| match error.kind() {
            std::io::ErrorKind::TimedOut => FetchError::timeout(format!("data of {path}"), read_timeout),
            _ => FetchError::transfer(&path, error),
        })?;
        drop(stream);
        if self.transfer_type == TransferType::Ascii {
            data = from_network_ascii(&data);
        }

        self.transport.finish_transfer().await?;
        self.sink.emit(&FetchEvent::TransferCompleted {
            path,
            bytes: copied,
            reply: self.transport.last_reply(),
        });
        Ok(data)
    }

    /// Logs out, then disconnects. Disconnect runs even if logout failed.
    ///
    /// # Errors
    ///
    /// Returns the logout error.
    #[instrument(skip(self))]
    pub async fn close(&mut self) -> Result<(), FetchError> {
        let logout = self.transport.logout().await;
        if logout.is_ok() {
            self.sink.emit(&FetchEvent::LoggedOut {
                reply: self.transport.last_reply(),
            });
        }
        self.disconnect().await;
        logout
    }

    /// Closes the sockets without logging out.
    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
        self.sink.emit(&FetchEvent::Disconnected);
    }
}

/// Replaces every CRLF pair with `\n`. Lone CR bytes are kept.
fn from_network_ascii(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}
