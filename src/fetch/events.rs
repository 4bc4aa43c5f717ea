//! Structured diagnostic events emitted at each fetch step.
//!
//! The pipeline reports what it does through an [`EventSink`]. The default
//! [`TracingSink`] turns events into `tracing` records; tests and embedders
//! can install their own sink. Fetch behavior never depends on the sink.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::ErrorKind;
use super::progress::{ProgressState, format_eta};
use crate::transport::TransferType;

/// Attempt step, used to label step failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Login,
    Configure,
    SizeQuery,
    Transfer,
    Logout,
}

/// One diagnostic event of a fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// Control connection established.
    Connected {
        host: String,
        port: u16,
        reply: String,
    },
    /// Credentials accepted.
    LoggedIn { user: String, reply: String },
    /// Transfer type, stream mode and data channel mode applied.
    TransferModeSet {
        transfer_type: TransferType,
        passive: bool,
        reply: String,
    },
    /// Remote size looked up and buffer size derived from it.
    SizeEstimated {
        path: String,
        size: i64,
        buffer_size: usize,
    },
    /// Server accepted the retrieve command.
    TransferStarted { path: String, reply: String },
    /// Progress tick from the copier.
    Progress(ProgressState),
    /// Data stream finished and the server confirmed it.
    TransferCompleted {
        path: String,
        bytes: u64,
        reply: String,
    },
    /// Server acknowledged the logout.
    LoggedOut { reply: String },
    /// Sockets closed.
    Disconnected,
    /// A step reported failure.
    StepFailed {
        step: Step,
        kind: ErrorKind,
        error: String,
    },
    /// A whole attempt failed.
    AttemptFailed {
        attempt: u32,
        max_attempts: u32,
        kind: ErrorKind,
        error: String,
    },
    /// Another attempt follows after `delay`.
    RetryScheduled { next_attempt: u32, delay: Duration },
    /// Final outcome of the fetch call.
    Finished {
        success: bool,
        attempts: u32,
        bytes: Option<u64>,
    },
}

/// Receiver of diagnostic events.
///
/// Implementations must tolerate concurrent calls from independent fetches.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &FetchEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &FetchEvent) {}
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &FetchEvent) {
        match event {
            FetchEvent::Connected { host, port, reply } => {
                info!(%host, port, %reply, "connected");
            }
            FetchEvent::LoggedIn { user, reply } => info!(%user, %reply, "logged in"),
            FetchEvent::TransferModeSet {
                transfer_type,
                passive,
                reply,
            } => info!(?transfer_type, passive, %reply, "transfer mode set"),
            FetchEvent::SizeEstimated {
                path,
                size,
                buffer_size,
            } => info!(%path, size, buffer_size, "file size"),
            FetchEvent::TransferStarted { path, reply } => {
                info!(%path, %reply, "transfer started");
            }
            FetchEvent::Progress(state) => match (state.fraction(), state.total_bytes) {
                (Some(fraction), Some(total)) => {
                    let eta = state
                        .eta()
                        .map_or_else(|| "unknown".to_string(), format_eta);
                    info!(
                        percent = (fraction * 100.0).round(),
                        %eta,
                        bytes = state.bytes_transferred,
                        total,
                        "progress"
                    );
                }
                _ => info!(bytes = state.bytes_transferred, "progress"),
            },
            FetchEvent::TransferCompleted { path, bytes, reply } => {
                info!(%path, bytes, %reply, "transfer completed");
            }
            FetchEvent::LoggedOut { reply } => info!(%reply, "logged out"),
            FetchEvent::Disconnected => debug!("disconnected"),
            FetchEvent::StepFailed { step, kind, error } => {
                warn!(?step, ?kind, %error, "step failed");
            }
            FetchEvent::AttemptFailed {
                attempt,
                max_attempts,
                kind,
                error,
            } => warn!(attempt, max_attempts, ?kind, %error, "attempt failed"),
            FetchEvent::RetryScheduled {
                next_attempt,
                delay,
            } => info!(next_attempt, delay_ms = delay.as_millis(), "retrying"),
            FetchEvent::Finished {
                success,
                attempts,
                bytes,
            } => info!(success, attempts, ?bytes, "fetch finished"),
        }
    }
}
