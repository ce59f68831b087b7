//! # Node Configuration
//!
//! Unified configuration for every ledger subsystem and runtime parameter.
//!
//! ## Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ML_IDENTITY_SEED` | `identity.seed` (64 hex chars) |
//! | `ML_QUORUM_THRESHOLD` | `council.quorum_threshold` |
//! | `ML_COUNCIL_SIZE` | `council.council_size` |
//! | `ML_FINALIZATION_WINDOW_SECS` | `epoch.finalization_window` |
//! | `ML_POLL_INTERVAL_SECS` | `epoch.poll_interval` |
//! | `ML_SYNC_TIMEOUT_MS` | `propagation.sync_timeout` |
//! | `ML_DATA_DIR` | `storage.data_dir` |

use ml_01_epoch_clock::DEFAULT_FINALIZATION_WINDOW;
use ml_02_ledger_store::{IngestionConfig, RetryPolicy, DEFAULT_DEFERRED_CAPACITY};
use ml_03_peer_propagation::PropagationConfig;
use ml_04_beheading::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_PAGE_SIZE};
use ml_05_peer_council::CouncilConfig;
use shared_crypto::Ed25519KeyPair;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub identity: IdentityConfig,
    pub epoch: EpochConfig,
    pub ledger: LedgerConfig,
    pub propagation: PropagationConfig,
    pub council: CouncilConfig,
    pub morgue: MorgueConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

impl NodeConfig {
    /// Defaults with `ML_*` overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`. Unset keys keep their current value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup("ML_IDENTITY_SEED") {
            Ed25519KeyPair::from_hex_seed(&seed)
                .map_err(|e| ConfigError::InvalidSeed(e.to_string()))?;
            self.identity.seed = Some(seed);
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "ML_QUORUM_THRESHOLD")? {
            self.council.quorum_threshold = value;
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "ML_COUNCIL_SIZE")? {
            self.council.council_size = value;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ML_FINALIZATION_WINDOW_SECS")? {
            self.epoch.finalization_window = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ML_POLL_INTERVAL_SECS")? {
            self.epoch.poll_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ML_SYNC_TIMEOUT_MS")? {
            self.propagation.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup("ML_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.council.quorum_threshold == 0 {
            return Err(ConfigError::ZeroQuorumThreshold);
        }
        if self.council.quorum_threshold > self.council.council_size {
            return Err(ConfigError::ThresholdExceedsCouncil {
                threshold: self.council.quorum_threshold,
                council_size: self.council.council_size,
            });
        }
        if self.epoch.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.morgue.max_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("quorum threshold must be at least 1")]
    ZeroQuorumThreshold,

    #[error("quorum threshold {threshold} exceeds council size {council_size}")]
    ThresholdExceedsCouncil {
        threshold: usize,
        council_size: usize,
    },

    #[error("epoch poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("morgue page size must be non-zero")]
    ZeroPageSize,

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid identity seed: {0}")]
    InvalidSeed(String),
}

/// Node identity. The Ed25519 public key doubles as the peer id.
#[derive(Clone, Default)]
pub struct IdentityConfig {
    /// Hex-encoded 32-byte seed. A fresh key is generated when unset.
    pub seed: Option<String>,
}

impl IdentityConfig {
    pub fn keypair(&self) -> Result<Ed25519KeyPair, ConfigError> {
        match &self.seed {
            Some(seed) => {
                Ed25519KeyPair::from_hex_seed(seed).map_err(|e| ConfigError::InvalidSeed(e.to_string()))
            }
            None => Ok(Ed25519KeyPair::generate()),
        }
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Epoch clock configuration.
#[derive(Debug, Clone)]
pub struct EpochConfig {
    /// Time before the boundary reported as the finalization window.
    pub finalization_window: Duration,
    /// How often the clock loop checks for rollover.
    pub poll_interval: Duration,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            finalization_window: DEFAULT_FINALIZATION_WINDOW,
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Ledger store and ingestion configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub retry: RetryPolicy,
    pub deferred_capacity: usize,
    pub max_pending_writes: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            deferred_capacity: DEFAULT_DEFERRED_CAPACITY,
            max_pending_writes: 10_000,
        }
    }
}

impl LedgerConfig {
    pub fn ingestion(&self) -> IngestionConfig {
        IngestionConfig {
            retry: self.retry,
            deferred_capacity: self.deferred_capacity,
            max_pending_writes: self.max_pending_writes,
        }
    }
}

/// Morgue (archive) configuration.
#[derive(Debug, Clone)]
pub struct MorgueConfig {
    /// zstd level, 1-22.
    pub compression_level: i32,
    /// Cap on history page size.
    pub max_page_size: usize,
}

impl Default for MorgueConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Network behaviour. The peer set itself comes from the transport.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Ask every known peer for its Head right after start-up.
    pub sync_on_startup: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            sync_on_startup: true,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// RocksDB directory. In-memory storage when unset.
    pub data_dir: Option<PathBuf>,
}
