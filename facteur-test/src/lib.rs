//! facteur test tooling
//!
//! A deterministic in-memory transport, ready-made configurations and the
//! protocol test suites exercising the session end to end.

#![doc(html_no_source)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

/// ready-made configurations for the test suites
pub mod config;

/// embedded self-signed TLS material
pub mod get_tls_file;

/// the in-memory transport and the `test_receiver!` harness
pub mod receiver;

#[cfg(test)]
mod tests;
