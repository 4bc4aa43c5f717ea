//! Fetch configuration: credentials, transfer mode policy, retry and timeouts.
//!
//! [`FetchConfiguration`] is a plain value assembled with consuming `with_*`
//! setters. A fetch takes it by reference and never changes it.

use std::fmt;
use std::time::Duration;

use super::constants::{
    ANONYMOUS_USER, CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
    READ_TIMEOUT_SECS,
};
use super::retry::RetryPolicy;
use crate::transport::TransferType;

/// Extensions (lowercase, without the dot) fetched in text mode under
/// [`TransferModePolicy::Auto`].
pub const TEXT_FILE_EXTENSIONS: [&str; 8] = ["txt", "json", "xml", "csv", "tsv", "md", "html", "htm"];

/// Login identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The well-known anonymous identity with an empty password.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER, "")
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the transfer type is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransferModePolicy {
    /// Always text.
    Text,
    /// Always binary.
    Binary,
    /// Text for known text extensions, binary otherwise.
    #[default]
    Auto,
}

impl TransferModePolicy {
    /// Resolves the policy for a remote path.
    #[must_use]
    pub fn resolve(self, path: &str) -> TransferType {
        match self {
            Self::Text => TransferType::Ascii,
            Self::Binary => TransferType::Binary,
            Self::Auto => {
                if has_text_extension(path) {
                    TransferType::Ascii
                } else {
                    TransferType::Binary
                }
            }
        }
    }
}

fn has_text_extension(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            TEXT_FILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Everything a fetch needs besides the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfiguration {
    credentials: Credentials,
    transfer_mode: TransferModePolicy,
    passive_mode: bool,
    max_attempts: u32,
    retry_delay: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Default for FetchConfiguration {
    fn default() -> Self {
        Self {
            credentials: Credentials::anonymous(),
            transfer_mode: TransferModePolicy::Auto,
            passive_mode: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

impl FetchConfiguration {
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = username.into();
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = password.into();
        self
    }

    #[must_use]
    pub fn with_transfer_mode(mut self, transfer_mode: TransferModePolicy) -> Self {
        self.transfer_mode = transfer_mode;
        self
    }

    #[must_use]
    pub fn with_passive_mode(mut self, passive_mode: bool) -> Self {
        self.passive_mode = passive_mode;
        self
    }

    /// Total number of attempts per fetch, clamped to at least 1.
    #[must_use]
    pub fn with_max_retries(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn transfer_mode(&self) -> TransferModePolicy {
        self.transfer_mode
    }

    #[must_use]
    pub fn passive_mode(&self) -> bool {
        self.passive_mode
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Retry policy derived from the attempt count and delay.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }
}
