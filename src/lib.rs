// ABOUTME: Library root for dropship - exposes the delivery pipeline for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod host;
pub mod install;
pub mod manifest;
pub mod migrate;
pub mod outcome;
pub mod output;
pub mod transport;
pub mod types;
