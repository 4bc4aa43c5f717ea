//! FTP Fetch Library
//!
//! This library retrieves a single remote file over FTP into memory,
//! retrying transient failures and reporting progress with an ETA.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Fetch pipeline: configuration, retry, progress, resources
//! - [`transport`] - FTP client behind the [`transport::Transport`] trait

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod transport;

// Re-export commonly used types
pub use fetch::{
    Credentials, Endpoint, ErrorKind, FetchConfiguration, FetchError, FetchEvent, FetchFailure,
    FetchRequest, ProgressState, Resource, RetryPolicy, TransferModePolicy, classify_error,
};
pub use transport::{Connector, FtpConnector, FtpTransport, Transport, TransferType};
