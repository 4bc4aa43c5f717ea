//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use ftp_fetch::TransferModePolicy;
use ftp_fetch::fetch::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, READ_TIMEOUT_SECS,
};

/// Fetch a single file over FTP, retrying transient failures.
///
/// The file is written to standard output unless --output is given.
#[derive(Parser, Debug)]
#[command(name = "ftp-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Remote file as ftp://host[:port]/path
    pub url: String,

    /// Write the file to this path instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Login name (anonymous when not set)
    #[arg(short, long, env = "FTP_FETCH_USER")]
    pub user: Option<String>,

    /// Login password
    #[arg(long, env = "FTP_FETCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Transfer mode (auto picks text for known text extensions)
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Use active mode (server connects back) instead of passive
    #[arg(long)]
    pub active: bool,

    /// Total attempts for transient failures (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub retries: u8,

    /// Seconds to wait between attempts (max 3600)
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs(), value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub retry_delay: u64,

    /// Connect timeout in seconds (1-600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub connect_timeout: u64,

    /// Timeout in seconds for each server reply and data read (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Decode the file with this encoding label (e.g. utf-8, latin1, shift_jis) and output text
    #[arg(long)]
    pub encoding: Option<String>,

    /// Do not show a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// `--mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Auto,
    Text,
    Binary,
}

impl From<ModeArg> for TransferModePolicy {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => Self::Auto,
            ModeArg::Text => Self::Text,
            ModeArg::Binary => Self::Binary,
        }
    }
}
