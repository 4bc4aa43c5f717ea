//! File-transfer protocol clients consumed by the fetch pipeline.
//!
//! The pipeline talks to the remote side only through the [`Transport`]
//! trait, one instance per attempt, created by a [`Connector`].
//! [`FtpTransport`] is the FTP implementation over tokio sockets.

mod ftp;
mod listing;
mod reply;

pub use ftp::{FtpConnector, FtpTransport};
pub use listing::parse_listing_line;
pub use reply::{Reply, parse_pasv_reply};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::fetch::FetchError;

/// Data representation negotiated before streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferType {
    /// Text (`TYPE A`).
    Ascii,
    /// Image/binary (`TYPE I`).
    Binary,
}

impl TransferType {
    /// Argument of the FTP `TYPE` command.
    #[must_use]
    pub fn type_code(self) -> &'static str {
        match self {
            Self::Ascii => "A",
            Self::Binary => "I",
        }
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name as listed.
    pub name: String,
    /// True for regular files (not directories or links).
    pub is_file: bool,
    /// Size in bytes as listed.
    pub size: u64,
}

/// Readable data channel of a retrieve command.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// A single connect/authenticate/transfer/disconnect session against one server.
///
/// Calls are made strictly in order by one fetch attempt; implementations
/// are not shared between attempts.
#[async_trait]
pub trait Transport: Send {
    /// Opens the control connection. `port` defaults to the protocol port.
    async fn connect(&mut self, host: &str, port: Option<u16>) -> Result<(), FetchError>;

    /// Authenticates.
    async fn login(&mut self, user: &str, password: &str) -> Result<(), FetchError>;

    /// Selects the data representation.
    async fn set_transfer_type(&mut self, transfer_type: TransferType) -> Result<(), FetchError>;

    /// Selects stream transfer mode.
    async fn set_stream_mode(&mut self) -> Result<(), FetchError>;

    /// Chooses passive (client opens data connection) or active data channels.
    fn set_passive_mode(&mut self, passive: bool);

    /// Lists exactly `path`.
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, FetchError>;

    /// Starts retrieving `path` and returns the data stream.
    async fn open_read_stream(&mut self, path: &str) -> Result<ByteSource, FetchError>;

    /// Waits for the server to confirm the transfer after the stream was drained.
    async fn finish_transfer(&mut self) -> Result<(), FetchError>;

    /// Ends the authenticated session.
    async fn logout(&mut self) -> Result<(), FetchError>;

    /// Closes all sockets. Never fails.
    async fn disconnect(&mut self);

    /// Text of the last server reply, for diagnostics.
    fn last_reply(&self) -> String;
}

/// Creates a fresh [`Transport`] for each attempt.
pub trait Connector: Send + Sync {
    fn new_transport(&self) -> Box<dyn Transport>;
}

impl<F> Connector for F
where
    F: Fn() -> Box<dyn Transport> + Send + Sync,
{
    fn new_transport(&self) -> Box<dyn Transport> {
        self()
    }
}
