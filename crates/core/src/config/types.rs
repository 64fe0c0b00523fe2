use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub directories: DirectoriesConfig,
    pub transmission: TransmissionConfig,
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

/// Directory layout the organizer operates on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoriesConfig {
    /// Where the torrent client downloads and seeds from.
    pub seeding: PathBuf,
    /// Where multi-part archives get unpacked to.
    pub extracted: PathBuf,
    /// Root of the curated library.
    pub destination: PathBuf,
}

/// Transmission RPC connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    pub host: String,
    #[serde(default = "default_rpc_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// How many times to attempt the initial connection before giving up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay between connection attempts, in seconds.
    #[serde(default = "default_connect_delay")]
    pub connect_delay_secs: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_rpc_port() -> u16 {
    9091
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_delay() -> u64 {
    5
}

fn default_timeout() -> u32 {
    30
}

/// A per-release placement override.
///
/// `pattern` is matched (case-insensitively) against the file's base name.
/// The first matching rule wins independently for each field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideRule {
    /// Regex matched against the source file's base name.
    pub pattern: String,
    /// Replaces the resolved series folder name.
    #[serde(default)]
    pub series: Option<String>,
    /// Replaces the library destination root.
    #[serde(default)]
    pub destination: Option<PathBuf>,
}

/// External event hooks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Program invoked with (placed path, human description) after each
    /// copy or move into the library.
    #[serde(default)]
    pub moved: Option<PathBuf>,
}

/// Copied-file ledger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("seedshelf.db")
}

/// Single-instance lock configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_path")]
    pub path: PathBuf,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: default_lock_path(),
        }
    }
}

fn default_lock_path() -> PathBuf {
    std::env::temp_dir().join("seedshelf.lock")
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub directories: DirectoriesConfig,
    pub transmission: SanitizedTransmissionConfig,
    pub overrides: Vec<OverrideRule>,
    pub events: EventsConfig,
    pub ledger: LedgerConfig,
    pub lock: LockConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTransmissionConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_attempts: u32,
    pub connect_delay_secs: u64,
    pub timeout_secs: u32,
}

impl Config {
    /// Returns a copy safe to log: the RPC password is redacted.
    pub fn sanitized(&self) -> SanitizedConfig {
        SanitizedConfig {
            directories: self.directories.clone(),
            transmission: SanitizedTransmissionConfig {
                host: self.transmission.host.clone(),
                port: self.transmission.port,
                user: self.transmission.user.clone(),
                password: self
                    .transmission
                    .password
                    .as_ref()
                    .map(|_| "<redacted>".to_string()),
                connect_attempts: self.transmission.connect_attempts,
                connect_delay_secs: self.transmission.connect_delay_secs,
                timeout_secs: self.transmission.timeout_secs,
            },
            overrides: self.overrides.clone(),
            events: self.events.clone(),
            ledger: self.ledger.clone(),
            lock: self.lock.clone(),
        }
    }
}
