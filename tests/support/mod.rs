//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod fake_ftp;

pub use fake_ftp::FakeFtpServer;

/// Deterministic byte pattern of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
