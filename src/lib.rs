//! ifsync - interface address tables for a packet filter
//!
//! Keeps, for every interface referenced by the filter configuration, a
//! table of the addresses currently assigned to that interface, and swaps
//! new snapshots into the live configuration without exposing a freed table
//! to concurrent lookups.

pub mod config;
pub mod error;
pub mod filter;
pub mod net;
pub mod telemetry;

pub use error::{Error, Result};
