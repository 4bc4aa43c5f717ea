//! Remote size estimation and transfer buffer sizing.

use tracing::{debug, warn};

use super::constants::{MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::transport::Transport;

/// Size value meaning "unknown".
pub const UNKNOWN_SIZE: i64 = -1;

/// Looks up the size of `path`.
///
/// Returns the listed size only when the listing of `path` has exactly one
/// entry and that entry is a regular file; otherwise [`UNKNOWN_SIZE`].
/// Listing failures are logged and reported as unknown.
pub async fn estimate_size(transport: &mut dyn Transport, path: &str) -> i64 {
    match transport.list(path).await {
        Ok(entries) => match entries.as_slice() {
            [entry] if entry.is_file => i64::try_from(entry.size).unwrap_or(i64::MAX),
            _ => {
                debug!(path, entries = entries.len(), "size unknown from listing");
                UNKNOWN_SIZE
            }
        },
        Err(error) => {
            warn!(path, %error, "size query failed");
            UNKNOWN_SIZE
        }
    }
}

/// Clamps a size estimate into `[MIN_BUFFER_SIZE, MAX_BUFFER_SIZE]`.
///
/// Unknown (`-1`) and zero sizes get the minimum.
#[must_use]
pub fn derive_buffer_size(size_estimate: i64) -> usize {
    usize::try_from(size_estimate)
        .unwrap_or(0)
        .clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
}

/// Converts an estimate into an optional byte total.
#[must_use]
pub fn known_size(size_estimate: i64) -> Option<u64> {
    u64::try_from(size_estimate).ok()
}
