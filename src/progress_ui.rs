//! Progress bar for a single transfer.

use std::io::IsTerminal;

use ftp_fetch::ProgressState;
use ftp_fetch::fetch::format_eta;
use indicatif::{ProgressBar, ProgressStyle};

/// Terminal progress display fed by the fetch progress listener.
///
/// Starts as a byte-count spinner and switches to a bar once a tick
/// carries a known total.
#[derive(Debug, Clone)]
pub(crate) struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    /// Visible only when `enabled` and stderr is a terminal.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled && std::io::stderr().is_terminal() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {bytes} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Callback for `FetchRequest::with_progress_listener`.
    pub(crate) fn listener(&self) -> impl Fn(&ProgressState) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |state| update(&bar, state)
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

fn update(bar: &ProgressBar, state: &ProgressState) {
    if let Some(total) = state.total_bytes
        && bar.length() != Some(total)
    {
        bar.set_length(total);
        bar.set_style(
            ProgressStyle::with_template(
                "[{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) ETA {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
    }
    bar.set_position(state.bytes_transferred);
    if let Some(eta) = state.eta() {
        bar.set_message(format_eta(eta));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn tick(bytes: u64, total: Option<u64>) -> ProgressState {
        ProgressState {
            bytes_transferred: bytes,
            total_bytes: total,
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_listener_tracks_known_total() {
        let progress = TransferProgress::new(false);
        let listener = progress.listener();

        listener(&tick(512, Some(2048)));
        assert_eq!(progress.bar().length(), Some(2048));
        assert_eq!(progress.bar().position(), 512);

        listener(&tick(2048, Some(2048)));
        assert_eq!(progress.bar().position(), 2048);
        progress.finish();
    }

    #[test]
    fn test_listener_with_unknown_total_counts_bytes() {
        let progress = TransferProgress::new(false);
        let listener = progress.listener();

        listener(&tick(4096, None));
        assert_eq!(progress.bar().position(), 4096);
    }
}
