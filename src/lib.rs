//! Library crate for viperscan-rs exposing reusable modules.
pub mod banner;
pub mod config;
pub mod console;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod ports;
pub mod report;
pub mod scanner;
pub mod store;
pub mod types;
pub mod vuln;
