//! Test doubles shared across the crate's tests.

mod mock_torrent_client;

pub use mock_torrent_client::MockTorrentClient;
