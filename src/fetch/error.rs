//! Error types for the fetch module.
//!
//! Every failure carries enough context (host, path, command, server reply)
//! to be useful in a log line on its own. Retry decisions are made from the
//! [`ErrorKind`] returned by [`classify_error`](super::classify_error).

use std::time::Duration;

use thiserror::Error;

/// Coarse failure category used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed URL or endpoint. Raised before any network I/O.
    Address,
    /// Connect failures, timeouts, dropped control channel, transient 4xx replies.
    Connectivity,
    /// Login rejected by the server.
    Authentication,
    /// Transfer type, stream mode or data channel setup rejected.
    ProtocolNegotiation,
    /// The remote path does not exist or cannot be retrieved.
    NotFound,
    /// Data stream interrupted mid-copy.
    Transfer,
    /// Fetched bytes are not valid in the requested text encoding.
    Decoding,
}

/// Errors that can occur while fetching or decoding a remote resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The address could not be parsed or is incomplete.
    #[error("invalid FTP address '{input}': {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// TCP connection to the server failed.
    #[error("could not connect to {host}:{port}: {source}")]
    Connect {
        /// Remote host.
        host: String,
        /// Remote port.
        port: u16,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// An operation did not complete within its timeout.
    #[error("timed out after {}s waiting for {operation}", timeout.as_secs())]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Reading or writing the control connection failed.
    #[error("control connection to {host} failed: {source}")]
    ControlChannel {
        /// Remote host.
        host: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The server answered with a transient negative reply (4xx) or closed the service.
    #[error("server unavailable during {command} ({code}): {text}")]
    ServiceUnavailable {
        /// Command that received the reply.
        command: String,
        /// FTP reply code.
        code: u16,
        /// Reply text.
        text: String,
    },

    /// The server rejected the credentials.
    #[error("login rejected for user '{user}' ({code}): {text}")]
    Authentication {
        /// Username that was rejected.
        user: String,
        /// FTP reply code.
        code: u16,
        /// Reply text.
        text: String,
    },

    /// The server rejected a session setup command.
    #[error("{command} rejected ({code}): {text}")]
    Negotiation {
        /// Command that was rejected.
        command: String,
        /// FTP reply code.
        code: u16,
        /// Reply text.
        text: String,
    },

    /// The remote file could not be retrieved.
    #[error("remote file not found: {path} ({code}): {text}")]
    NotFound {
        /// Remote path.
        path: String,
        /// FTP reply code.
        code: u16,
        /// Reply text.
        text: String,
    },

    /// The data stream failed mid-copy.
    #[error("transfer of {path} interrupted: {source}")]
    Transfer {
        /// Remote path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fetched bytes could not be decoded as text.
    #[error("cannot decode resource as {encoding}: {reason}")]
    Decoding {
        /// Encoding name or label requested.
        encoding: String,
        /// Why decoding failed.
        reason: String,
    },
}

impl FetchError {
    /// Creates an invalid address error.
    pub fn invalid_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(host: impl Into<String>, port: u16, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            port,
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Creates a control channel error.
    pub fn control_channel(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::ControlChannel {
            host: host.into(),
            source,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(user: impl Into<String>, code: u16, text: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            code,
            text: text.into(),
        }
    }

    /// Creates a negotiation error.
    pub fn negotiation(command: impl Into<String>, code: u16, text: impl Into<String>) -> Self {
        Self::Negotiation {
            command: command.into(),
            code,
            text: text.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>, code: u16, text: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            code,
            text: text.into(),
        }
    }

    /// Creates a transfer error.
    pub fn transfer(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }

    /// Creates a decoding error.
    pub fn decoding(encoding: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decoding {
            encoding: encoding.into(),
            reason: reason.into(),
        }
    }

    /// Maps a negative reply to an error, routing transient 4xx codes to
    /// [`FetchError::ServiceUnavailable`] and everything else to
    /// [`FetchError::Negotiation`].
    pub fn rejected(command: impl Into<String>, code: u16, text: impl Into<String>) -> Self {
        if (400..500).contains(&code) {
            Self::ServiceUnavailable {
                command: command.into(),
                code,
                text: text.into(),
            }
        } else {
            Self::negotiation(command, code, text)
        }
    }
}
