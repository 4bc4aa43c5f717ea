//! Constants for the fetch module (timeouts, retry defaults, buffer bounds).

use std::time::Duration;

/// Default control/data connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default read timeout for a single server reply or data read (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of attempts for one fetch call (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Smallest transfer buffer, also used when the remote size is unknown.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Largest transfer buffer (256 MiB).
pub const MAX_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// Progress cadence when the remote size is unknown (1 MiB).
pub const UNKNOWN_SIZE_REPORT_INTERVAL: u64 = 1024 * 1024;

/// Username of the well-known anonymous identity.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;
