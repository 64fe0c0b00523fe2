pub mod config;
pub mod events;
pub mod fsops;
pub mod gc;
pub mod ledger;
pub mod lock;
pub mod metadata;
pub mod reconciler;
pub mod resolver;
pub mod supersede;
pub mod testing;
pub mod torrent_client;
pub mod unpack;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use fsops::FsOps;
pub use gc::{GarbageCollector, GcStats};
pub use ledger::{CopiedLedger, LedgerError, SqliteLedger};
pub use lock::{InstanceLock, LockError};
pub use reconciler::{ReconcileStats, Reconciler};
pub use torrent_client::{
    SeedingSnapshot, TorrentClient, TorrentClientError, TransmissionClient,
};
