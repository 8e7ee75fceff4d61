//! Daemon configuration file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub pong_cache: PongCacheConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listening socket and connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// 0 = OS-assigned ephemeral port.
    #[serde(default)]
    pub listen_port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Provenance table sizing (Message Router).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Entries per provenance table chunk (`N`).
    #[serde(default = "default_chunk_capacity")]
    pub chunk_capacity: usize,
    /// Chunks kept in rotation (`M`).
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,
    /// Minimum chunk age before recycling, in seconds (`T_min`).
    #[serde(default = "default_min_chunk_age_secs")]
    pub min_chunk_age_secs: u64,
}

/// Pong cache sizing and ping/pong admission tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongCacheConfig {
    /// Highest hop bucket kept separately (`H`).
    #[serde(default = "default_max_hop")]
    pub max_hop: u8,
    /// Per-class recent-hosts FIFO size (`R`).
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: usize,
    /// Maximum pongs returned for a single ping (`MAX_PONGS`).
    #[serde(default = "default_max_pongs")]
    pub max_pongs: usize,
    #[serde(default = "default_old_cache_ratio")]
    pub old_cache_ratio: f32,
    #[serde(default = "default_min_up_ping")]
    pub min_up_ping: usize,
    #[serde(default = "default_up_ping_ratio")]
    pub up_ping_ratio: f32,
    #[serde(default = "default_old_ping_period_secs")]
    pub old_ping_period_secs: u64,
    #[serde(default = "default_min_dup_msg")]
    pub min_dup_msg: u32,
    #[serde(default = "default_min_dup_ratio")]
    pub min_dup_ratio: f32,
}

/// Query admission and routing tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Hard per-query TTL ceiling regardless of the header's own TTL.
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u8,
    /// After this many identical re-queries, suppress further ones.
    #[serde(default = "default_requery_threshold")]
    pub requery_threshold: u32,
    /// Stop adding results to a query hit once this many are collected.
    #[serde(default = "default_search_max_items")]
    pub search_max_items: usize,
}

/// Persisted state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Reachability and hostile-address filtering, consulted by pong
/// admission and the query accept path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Our own externally-visible address, dotted quad. Empty if unknown.
    #[serde(default)]
    pub self_ip: String,
    /// Addresses (dotted quad) to treat as hostile; pongs pointing at
    /// them are never cached or forwarded, and out-of-band query
    /// replies never go to them either.
    #[serde(default)]
    pub hostile_ips: Vec<String>,
    /// Whether this node is itself behind a firewall/NAT it cannot open
    /// a push connection through.
    #[serde(default)]
    pub self_firewalled: bool,
}

impl SecurityConfig {
    pub fn self_ip_octets(&self) -> [u8; 4] {
        self.self_ip
            .parse::<std::net::Ipv4Addr>()
            .map(|a| a.octets())
            .unwrap_or([0, 0, 0, 0])
    }

    pub fn hostile_ip_set(&self) -> std::collections::HashSet<[u8; 4]> {
        self.hostile_ips
            .iter()
            .filter_map(|s| s.parse::<std::net::Ipv4Addr>().ok())
            .map(|a| a.octets())
            .collect()
    }
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

fn default_max_connections() -> u32 {
    256
}

fn default_chunk_capacity() -> usize {
    1 << 14
}

fn default_chunk_count() -> usize {
    32
}

fn default_min_chunk_age_secs() -> u64 {
    1800
}

fn default_max_hop() -> u8 {
    7
}

fn default_recent_capacity() -> usize {
    50
}

fn default_bucket_capacity() -> usize {
    20
}

fn default_max_pongs() -> usize {
    10
}

fn default_old_cache_ratio() -> f32 {
    0.75
}

fn default_min_up_ping() -> usize {
    3
}

fn default_up_ping_ratio() -> f32 {
    0.2
}

fn default_old_ping_period_secs() -> u64 {
    300
}

fn default_min_dup_msg() -> u32 {
    4
}

fn default_min_dup_ratio() -> f32 {
    0.5
}

fn default_max_ttl() -> u8 {
    7
}

fn default_requery_threshold() -> u32 {
    3
}

fn default_search_max_items() -> usize {
    255
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: 0,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: default_chunk_capacity(),
            chunk_count: default_chunk_count(),
            min_chunk_age_secs: default_min_chunk_age_secs(),
        }
    }
}

impl Default for PongCacheConfig {
    fn default() -> Self {
        Self {
            max_hop: default_max_hop(),
            recent_capacity: default_recent_capacity(),
            bucket_capacity: default_bucket_capacity(),
            max_pongs: default_max_pongs(),
            old_cache_ratio: default_old_cache_ratio(),
            min_up_ping: default_min_up_ping(),
            up_ping_ratio: default_up_ping_ratio(),
            old_ping_period_secs: default_old_ping_period_secs(),
            min_dup_msg: default_min_dup_msg(),
            min_dup_ratio: default_min_dup_ratio(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_ttl: default_max_ttl(),
            requery_threshold: default_requery_threshold(),
            search_max_items: default_search_max_items(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl PongCacheConfig {
    pub fn to_runtime(&self) -> servent_pongcache::PongCacheConfig {
        servent_pongcache::PongCacheConfig {
            max_hop: self.max_hop,
            recent_capacity: self.recent_capacity,
            bucket_capacity: self.bucket_capacity,
            max_pongs: self.max_pongs,
            old_cache_ratio: self.old_cache_ratio,
            min_up_ping: self.min_up_ping,
            up_ping_ratio: self.up_ping_ratio,
            old_ping_period: std::time::Duration::from_secs(self.old_ping_period_secs),
            min_dup_msg: self.min_dup_msg,
            min_dup_ratio: self.min_dup_ratio,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location, falling
    /// back to defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SERVENT_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("SERVENT_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/servent")
        }
        #[cfg(target_os = "linux")]
        {
            dirs_fallback(".servent")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("servent")
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            dirs_fallback(".servent")
        }
    }
}

fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/servent"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.network.listen_port, 0);
        assert_eq!(config.pong_cache.max_hop, 7);
        assert_eq!(config.pong_cache.recent_capacity, 50);
        assert_eq!(config.query.max_ttl, 7);
        assert_eq!(config.router.chunk_capacity, 1 << 14);
        assert_eq!(config.router.chunk_count, 32);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.pong_cache.max_pongs, config.pong_cache.max_pongs);
    }

    #[test]
    fn pong_cache_config_converts_to_runtime_type() {
        let config = PongCacheConfig::default();
        let runtime = config.to_runtime();
        assert_eq!(runtime.max_hop, config.max_hop);
        assert_eq!(runtime.old_ping_period.as_secs(), config.old_ping_period_secs);
    }
}
