//! FTP client over tokio sockets.
//!
//! Implements the subset of RFC 959 needed to retrieve one file: login,
//! `TYPE`, `MODE S`, passive (`PASV`) or active (`PORT`) data channels,
//! `LIST`, `RETR` and `QUIT`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, instrument, trace, warn};

use super::listing::parse_listing_line;
use super::reply::{Reply, parse_pasv_reply};
use super::{ByteSource, Connector, RemoteEntry, TransferType, Transport};
use crate::fetch::FetchError;
use crate::fetch::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_FTP_PORT, READ_TIMEOUT_SECS};

/// Builds a fresh [`FtpTransport`] per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpConnector {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }
}

impl FtpConnector {
    /// Creates a connector with explicit timeouts.
    #[must_use]
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }
}

impl Connector for FtpConnector {
    fn new_transport(&self) -> Box<dyn Transport> {
        Box::new(FtpTransport::new(self.connect_timeout, self.read_timeout))
    }
}

/// Data connection being set up for the next transfer command.
enum PendingData {
    /// Passive mode: already connected to the server's data port.
    Connected(TcpStream),
    /// Active mode: waiting for the server to connect back.
    Listening(TcpListener),
}

/// One FTP control connection.
#[derive(Debug)]
pub struct FtpTransport {
    control: Option<BufStream<TcpStream>>,
    host: String,
    passive: bool,
    last_reply: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl FtpTransport {
    /// Creates an unconnected transport. Passive mode is on by default.
    #[must_use]
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            control: None,
            host: String::new(),
            passive: true,
            last_reply: String::new(),
            connect_timeout,
            read_timeout,
        }
    }

    fn control(&mut self) -> Result<&mut BufStream<TcpStream>, FetchError> {
        let host = self.host.clone();
        self.control.as_mut().ok_or_else(|| {
            FetchError::control_channel(
                host,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected"),
            )
        })
    }

    async fn read_reply(&mut self, operation: &str) -> Result<Reply, FetchError> {
        let read_timeout = self.read_timeout;
        let host = self.host.clone();
        let control = self.control()?;
        let reply = tokio::time::timeout(read_timeout, Reply::read_from(control))
            .await
            .map_err(|_| FetchError::timeout(format!("reply to {operation}"), read_timeout))?
            .map_err(|e| FetchError::control_channel(&host, e))?
            .ok_or_else(|| {
                FetchError::control_channel(
                    &host,
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "server closed the control connection",
                    ),
                )
            })?;
        trace!(code = reply.code, text = %reply.text(), "reply");
        self.last_reply = reply.text();
        Ok(reply)
    }

    /// Sends one command line and reads its reply.
    async fn command(&mut self, command: &str) -> Result<Reply, FetchError> {
        let host = self.host.clone();
        let shown = redact(command);
        debug!(command = %shown, "sending command");
        let control = self.control()?;
        control
            .write_all(format!("{command}\r\n").as_bytes())
            .await
            .map_err(|e| FetchError::control_channel(&host, e))?;
        control
            .flush()
            .await
            .map_err(|e| FetchError::control_channel(&host, e))?;
        self.read_reply(&shown).await
    }

    /// Sends a command that must complete with a 2yz reply.
    async fn expect_completion(&mut self, command: &str) -> Result<Reply, FetchError> {
        let reply = self.command(command).await?;
        if reply.is_completion() {
            Ok(reply)
        } else {
            Err(FetchError::rejected(command, reply.code, reply.text()))
        }
    }

    async fn prepare_data_channel(&mut self) -> Result<PendingData, FetchError> {
        if self.passive {
            let reply = self.command("PASV").await?;
            if reply.code != 227 {
                return Err(FetchError::rejected("PASV", reply.code, reply.text()));
            }
            let advertised = parse_pasv_reply(&reply.text()).ok_or_else(|| {
                FetchError::negotiation("PASV", reply.code, "unparseable passive address")
            })?;
            let mut addr = SocketAddr::V4(advertised);
            if advertised.ip().is_unspecified() {
                let peer = self.peer_addr()?;
                addr.set_ip(peer.ip());
            }
            debug!(%addr, "opening passive data connection");
            let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| FetchError::timeout("data connection", self.connect_timeout))?
                .map_err(|e| FetchError::connect(addr.ip().to_string(), addr.port(), e))?;
            Ok(PendingData::Connected(stream))
        } else {
            let local_ip = self.local_addr()?.ip();
            let IpAddr::V4(ipv4) = local_ip else {
                return Err(FetchError::negotiation(
                    "PORT",
                    0,
                    "active mode requires an IPv4 control connection",
                ));
            };
            let listener = TcpListener::bind((local_ip, 0))
                .await
                .map_err(|e| FetchError::control_channel(&self.host, e))?;
            let port = listener
                .local_addr()
                .map_err(|e| FetchError::control_channel(&self.host, e))?
                .port();
            let [a, b, c, d] = ipv4.octets();
            let command = format!("PORT {a},{b},{c},{d},{},{}", port >> 8, port & 0xff);
            self.expect_completion(&command).await?;
            Ok(PendingData::Listening(listener))
        }
    }

    async fn establish_data_channel(&self, pending: PendingData) -> Result<TcpStream, FetchError> {
        match pending {
            PendingData::Connected(stream) => Ok(stream),
            PendingData::Listening(listener) => {
                let (stream, peer) = tokio::time::timeout(self.connect_timeout, listener.accept())
                    .await
                    .map_err(|_| FetchError::timeout("active data connection", self.connect_timeout))?
                    .map_err(|e| FetchError::control_channel(&self.host, e))?;
                debug!(%peer, "server opened active data connection");
                Ok(stream)
            }
        }
    }

    /// Sends a transfer command and opens its data stream.
    ///
    /// 450/550 rejections map to [`FetchError::NotFound`].
    async fn start_transfer(
        &mut self,
        command: &str,
        path: &str,
    ) -> Result<TcpStream, FetchError> {
        let pending = self.prepare_data_channel().await?;
        let reply = self.command(command).await?;
        if !reply.is_preliminary() {
            return Err(match reply.code {
                450 | 550 => FetchError::not_found(path, reply.code, reply.text()),
                code => FetchError::rejected(command, code, reply.text()),
            });
        }
        self.establish_data_channel(pending).await
    }

    fn peer_addr(&mut self) -> Result<SocketAddr, FetchError> {
        let host = self.host.clone();
        self.control()?
            .get_ref()
            .peer_addr()
            .map_err(|e| FetchError::control_channel(host, e))
    }

    fn local_addr(&mut self) -> Result<SocketAddr, FetchError> {
        let host = self.host.clone();
        self.control()?
            .get_ref()
            .local_addr()
            .map_err(|e| FetchError::control_channel(host, e))
    }
}

/// `VERB path`, or the bare verb when `path` is empty.
fn transfer_command(verb: &str, path: &str) -> String {
    if path.is_empty() {
        verb.to_string()
    } else {
        format!("{verb} {path}")
    }
}

#[async_trait]
impl Transport for FtpTransport {
    #[instrument(skip(self))]
    async fn connect(&mut self, host: &str, port: Option<u16>) -> Result<(), FetchError> {
        let port = port.unwrap_or(DEFAULT_FTP_PORT);
        self.host = host.to_string();

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| FetchError::timeout(format!("connect to {host}:{port}"), self.connect_timeout))?
            .map_err(|e| FetchError::connect(host, port, e))?;
        self.control = Some(BufStream::new(stream));

        let mut greeting = self.read_reply("greeting").await?;
        // 120: service ready in nnn minutes, the real greeting follows.
        while greeting.code == 120 {
            greeting = self.read_reply("greeting").await?;
        }
        if greeting.code != 220 {
            return Err(FetchError::rejected("greeting", greeting.code, greeting.text()));
        }
        Ok(())
    }

    #[instrument(skip(self, password))]
    async fn login(&mut self, user: &str, password: &str) -> Result<(), FetchError> {
        let mut reply = self.command(&format!("USER {user}")).await?;
        if reply.is_intermediate() {
            reply = self.command(&format!("PASS {password}")).await?;
        }
        match reply.code {
            200..=299 => Ok(()),
            421 => Err(FetchError::rejected("login", reply.code, reply.text())),
            code => Err(FetchError::authentication(user, code, reply.text())),
        }
    }

    async fn set_transfer_type(&mut self, transfer_type: TransferType) -> Result<(), FetchError> {
        self.expect_completion(&format!("TYPE {}", transfer_type.type_code()))
            .await
            .map(|_| ())
    }

    async fn set_stream_mode(&mut self) -> Result<(), FetchError> {
        self.expect_completion("MODE S").await.map(|_| ())
    }

    fn set_passive_mode(&mut self, passive: bool) {
        self.passive = passive;
    }

    #[instrument(skip(self))]
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, FetchError> {
        let mut data = match self.start_transfer(&transfer_command("LIST", path), path).await {
            Ok(data) => data,
            Err(FetchError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut raw = Vec::new();
        let read = tokio::time::timeout(self.read_timeout, data.read_to_end(&mut raw)).await;
        drop(data);
        // The completion reply (226, or 426 after an abort) must be consumed
        // even when the data read failed, or the next command reads it.
        let finished = self.finish_transfer().await;
        read.map_err(|_| FetchError::timeout("directory listing", self.read_timeout))?
            .map_err(|e| FetchError::transfer(path, e))?;
        finished?;

        let text = String::from_utf8_lossy(&raw);
        let entries: Vec<RemoteEntry> = text.lines().filter_map(parse_listing_line).collect();
        debug!(lines = text.lines().count(), entries = entries.len(), "listing parsed");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn open_read_stream(&mut self, path: &str) -> Result<ByteSource, FetchError> {
        let data = self.start_transfer(&transfer_command("RETR", path), path).await?;
        Ok(Box::new(data))
    }

    async fn finish_transfer(&mut self) -> Result<(), FetchError> {
        let reply = self.read_reply("transfer completion").await?;
        if reply.is_completion() {
            Ok(())
        } else {
            Err(FetchError::rejected("transfer", reply.code, reply.text()))
        }
    }

    async fn logout(&mut self) -> Result<(), FetchError> {
        self.expect_completion("QUIT").await.map(|_| ())
    }

    async fn disconnect(&mut self) {
        if let Some(mut control) = self.control.take()
            && let Err(error) = control.get_mut().shutdown().await
        {
            warn!(host = %self.host, %error, "control connection shutdown failed");
        }
    }

    fn last_reply(&self) -> String {
        self.last_reply.clone()
    }
}

/// Hides the argument of `PASS` in logs.
fn redact(command: &str) -> String {
    if command.starts_with("PASS ") {
        "PASS ****".to_string()
    } else {
        command.to_string()
    }
}
