//! Scripted in-memory transport for unit tests.

use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::FetchError;
use super::events::Step;
use crate::transport::{ByteSource, Connector, RemoteEntry, Transport, TransferType};

type ErrorFactory = Arc<dyn Fn() -> FetchError + Send + Sync>;

/// Transport that serves fixed bytes and fails at chosen steps.
#[derive(Clone)]
pub(crate) struct ScriptedTransport {
    data: Vec<u8>,
    listing: Vec<RemoteEntry>,
    list_error: Option<ErrorFactory>,
    failures: Vec<(Step, ErrorFactory)>,
    broken_stream: bool,
    calls: Arc<Mutex<Vec<String>>>,
    last_reply: String,
}

impl ScriptedTransport {
    /// Serves `data`; the listing reports it as one regular file.
    pub(crate) fn serving(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            listing: vec![RemoteEntry {
                name: "file".to_string(),
                is_file: true,
                size: data.len() as u64,
            }],
            list_error: None,
            failures: Vec::new(),
            broken_stream: false,
            calls: Arc::default(),
            last_reply: String::new(),
        }
    }

    pub(crate) fn with_listing(mut self, listing: Vec<RemoteEntry>) -> Self {
        self.listing = listing;
        self
    }

    pub(crate) fn with_list_error(
        mut self,
        error: impl Fn() -> FetchError + Send + Sync + 'static,
    ) -> Self {
        self.list_error = Some(Arc::new(error));
        self
    }

    /// Makes `step` fail with the error built by `error`.
    pub(crate) fn failing_at(
        mut self,
        step: Step,
        error: impl Fn() -> FetchError + Send + Sync + 'static,
    ) -> Self {
        self.failures.push((step, Arc::new(error)));
        self
    }

    /// The data stream delivers all bytes and then fails with a reset.
    pub(crate) fn with_broken_stream(mut self) -> Self {
        self.broken_stream = true;
        self
    }

    /// Shares the call log with `calls`.
    pub(crate) fn recording_into(mut self, calls: Arc<Mutex<Vec<String>>>) -> Self {
        self.calls = calls;
        self
    }

    fn record(&mut self, call: impl Into<String>, reply: &str) {
        self.last_reply = reply.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }

    fn check(&self, step: Step) -> Result<(), FetchError> {
        match self.failures.iter().find(|(s, _)| *s == step) {
            Some((_, error)) => Err(error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self, host: &str, port: Option<u16>) -> Result<(), FetchError> {
        self.record(format!("connect {host}:{port:?}"), "220 ready");
        self.check(Step::Connect)
    }

    async fn login(&mut self, user: &str, _password: &str) -> Result<(), FetchError> {
        self.record(format!("login {user}"), "230 logged in");
        self.check(Step::Login)
    }

    async fn set_transfer_type(&mut self, transfer_type: TransferType) -> Result<(), FetchError> {
        self.record(format!("type {}", transfer_type.type_code()), "200 type set");
        self.check(Step::Configure)
    }

    async fn set_stream_mode(&mut self) -> Result<(), FetchError> {
        self.record("mode S", "200 mode set");
        Ok(())
    }

    fn set_passive_mode(&mut self, passive: bool) {
        self.record(format!("passive {passive}"), "");
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, FetchError> {
        self.record(format!("list {path}"), "226 listing sent");
        self.check(Step::SizeQuery)?;
        match &self.list_error {
            Some(error) => Err(error()),
            None => Ok(self.listing.clone()),
        }
    }

    async fn open_read_stream(&mut self, path: &str) -> Result<ByteSource, FetchError> {
        self.record(format!("retr {path}"), "150 opening data connection");
        self.check(Step::Transfer)?;
        let cursor = Cursor::new(self.data.clone());
        if self.broken_stream {
            Ok(Box::new(cursor.chain(ResetReader)))
        } else {
            Ok(Box::new(cursor))
        }
    }

    async fn finish_transfer(&mut self) -> Result<(), FetchError> {
        self.record("finish", "226 transfer complete");
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), FetchError> {
        self.record("logout", "221 goodbye");
        self.check(Step::Logout)
    }

    async fn disconnect(&mut self) {
        self.record("disconnect", "");
    }

    fn last_reply(&self) -> String {
        self.last_reply.clone()
    }
}

struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }
}

/// Connector that builds a transport per attempt and counts attempts.
pub(crate) struct ScriptedConnector<F> {
    script: F,
    attempts: Arc<AtomicU32>,
}

impl<F> ScriptedConnector<F>
where
    F: Fn(u32) -> ScriptedTransport + Send + Sync,
{
    /// `script` receives the 1-indexed attempt number.
    pub(crate) fn new(script: F) -> Self {
        Self {
            script,
            attempts: Arc::default(),
        }
    }

    pub(crate) fn attempts(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

impl<F> Connector for ScriptedConnector<F>
where
    F: Fn(u32) -> ScriptedTransport + Send + Sync,
{
    fn new_transport(&self) -> Box<dyn Transport> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        Box::new((self.script)(attempt))
    }
}

/// Retryable connect failure.
pub(crate) fn connection_refused() -> FetchError {
    FetchError::connect(
        "ftp.example.org",
        21,
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
    )
}

/// Deterministic byte pattern of `len` bytes.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
