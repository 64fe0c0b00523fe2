//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait plus the Transmission RPC
//! implementation. The reconciler only ever sees one point-in-time
//! `SeedingSnapshot` per run.

mod transmission;
mod types;

pub use transmission::TransmissionClient;
pub use types::*;
