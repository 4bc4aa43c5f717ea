//! Resilient single-file FTP fetch into memory.
//!
//! This module runs one connect-transfer-disconnect session per attempt
//! and wraps the attempts in a bounded retry policy.
//!
//! # Features
//!
//! - Transfer mode chosen from the file extension (text or binary)
//! - Read buffer sized from the remote file size (1 KiB to 256 MiB)
//! - Progress reports with ETA every 1% of the transfer
//! - Fixed-delay retry for connectivity and transfer failures only
//! - Structured events at every step through an [`EventSink`]
//!
//! # Example
//!
//! ```no_run
//! use ftp_fetch::fetch::FetchRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = FetchRequest::new().with_max_retries(3);
//! if let Some(resource) = request.from_url("ftp://ftp.example.org/pub/readme.txt").await? {
//!     println!("{}", resource.as_string()?);
//! }
//! # Ok(())
//! # }
//! ```

mod buffer;
mod config;
pub mod constants;
mod endpoint;
mod error;
pub mod events;
mod progress;
mod request;
mod resource;
mod retry;
mod session;

#[cfg(test)]
mod testing;

pub use buffer::{UNKNOWN_SIZE, derive_buffer_size, estimate_size, known_size};
pub use config::{Credentials, FetchConfiguration, TEXT_FILE_EXTENSIONS, TransferModePolicy};
pub use endpoint::{Endpoint, MAX_URL_LENGTH};
pub use error::{ErrorKind, FetchError};
pub use events::{EventSink, FetchEvent, NullSink, Step, TracingSink};
pub use progress::{
    CopyOptions, ProgressState, copy_with_progress, default_report_interval, format_eta,
};
pub use request::{FetchRequest, ProgressListener};
pub use resource::Resource;
pub use retry::{
    DEFAULT_RETRYABLE_KINDS, FetchFailure, RetryDecision, RetryPolicy, classify_error,
    retry_silently, run_with_retry,
};
pub use session::{Session, SizeEstimate};
