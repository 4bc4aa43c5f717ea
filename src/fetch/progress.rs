//! Streaming copy with progress reporting and ETA.
//!
//! [`copy_with_progress`] moves bytes from a reader into a writer in chunks of
//! the configured buffer size and calls a progress callback roughly every
//! `report_every` bytes, plus once at the end if the last chunk was not
//! reported yet.

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{instrument, trace};

use super::constants::UNKNOWN_SIZE_REPORT_INTERVAL;

/// Snapshot of a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    /// Bytes copied so far.
    pub bytes_transferred: u64,
    /// Expected total, when the remote size is known.
    pub total_bytes: Option<u64>,
    /// Time since the copy started.
    pub elapsed: Duration,
}

impl ProgressState {
    /// Fraction done in `[0, 1]`, or `None` when the total is unknown or zero.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let fraction = self.bytes_transferred as f64 / total as f64;
                Some(fraction.clamp(0.0, 1.0))
            }
            _ => None,
        }
    }

    /// Estimated time remaining: `elapsed * (1 - fraction) / fraction`.
    ///
    /// `None` when the fraction is unknown or zero.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        let fraction = self.fraction()?;
        if fraction <= 0.0 {
            return None;
        }
        Some(self.elapsed.mul_f64((1.0 - fraction) / fraction))
    }
}

/// Formats a duration as `HHh MMm SSs`.
#[must_use]
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    format!(
        "{:02}h {:02}m {:02}s",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Progress cadence for a transfer: 1% of the total when known.
#[must_use]
pub fn default_report_interval(total_bytes: Option<u64>) -> u64 {
    match total_bytes {
        Some(total) if total > 0 => total.div_ceil(100).max(1),
        _ => UNKNOWN_SIZE_REPORT_INTERVAL,
    }
}

/// Settings for one [`copy_with_progress`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Read chunk size.
    pub buffer_size: usize,
    /// Expected total, when known.
    pub total_bytes: Option<u64>,
    /// Callback cadence in bytes.
    pub report_every: u64,
    /// Maximum wait for a single read.
    pub read_timeout: Option<Duration>,
}

impl CopyOptions {
    /// Options with the default 1% cadence and no read timeout.
    #[must_use]
    pub fn new(buffer_size: usize, total_bytes: Option<u64>) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            total_bytes,
            report_every: default_report_interval(total_bytes),
            read_timeout: None,
        }
    }

    /// Sets the per-read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// Copies `reader` into `writer` until EOF, reporting progress.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns the first read or write error. A read that exceeds
/// `options.read_timeout` fails with [`std::io::ErrorKind::TimedOut`].
#[instrument(level = "debug", skip_all, fields(buffer_size = options.buffer_size, total = ?options.total_bytes))]
pub async fn copy_with_progress<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    options: &CopyOptions,
    mut on_progress: F,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(ProgressState),
{
    let started = Instant::now();
    let mut buf = vec![0u8; options.buffer_size.max(1)];
    let mut transferred: u64 = 0;
    let mut last_reported: u64 = 0;
    let report_every = options.report_every.max(1);

    loop {
        let read = match options.read_timeout {
            Some(limit) => tokio::time::timeout(limit, reader.read(&mut buf))
                .await
                .map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no data received for {}s", limit.as_secs()),
                    )
                })??,
            None => reader.read(&mut buf).await?,
        };
        if read == 0 {
            break;
        }

        writer.write_all(&buf[..read]).await?;
        transferred += read as u64;
        trace!(read, transferred, "chunk copied");

        if transferred - last_reported >= report_every {
            last_reported = transferred;
            on_progress(ProgressState {
                bytes_transferred: transferred,
                total_bytes: options.total_bytes,
                elapsed: started.elapsed(),
            });
        }
    }

    writer.flush().await?;

    if transferred != last_reported {
        on_progress(ProgressState {
            bytes_transferred: transferred,
            total_bytes: options.total_bytes,
            elapsed: started.elapsed(),
        });
    }

    Ok(transferred)
}
