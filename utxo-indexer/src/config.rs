use indexer_util::UTXO_INDEXER_SERVICE_HTTP_PORT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

fn default_node_rpc_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_tip_method() -> String {
    "chain_getBestBlockNumber".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_rpc_url")]
    pub rpc_url: String,

    // JSON-RPC method returning the node's best block number
    #[serde(default = "default_tip_method")]
    pub tip_method: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_node_rpc_url(),
            tip_method: default_tip_method(),
        }
    }
}

fn default_confirm_threshold() -> u64 {
    5
}

fn default_items_per_page() -> usize {
    15
}

fn default_max_items_per_page() -> usize {
    100
}

fn default_sync_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    // Trailing blocks hidden from onlyConfirmed queries
    #[serde(default = "default_confirm_threshold")]
    pub confirm_threshold: u64,

    #[serde(default = "default_items_per_page")]
    pub default_items_per_page: usize,

    #[serde(default = "default_max_items_per_page")]
    pub max_items_per_page: usize,

    // Upper bound of the sync-before-query wait
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: default_confirm_threshold(),
            default_items_per_page: default_items_per_page(),
            max_items_per_page: default_max_items_per_page(),
            sync_timeout_ms: default_sync_timeout_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcServer {
    #[serde(default = "default_rpc_port")]
    pub port: u16,
}

fn default_rpc_port() -> u16 {
    UTXO_INDEXER_SERVICE_HTTP_PORT
}

impl Default for RpcServer {
    fn default() -> Self {
        RpcServer {
            port: default_rpc_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IndexerConfig {
    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub rpc_server: RpcServer,
}

impl IndexerConfig {
    pub fn load(root_dir: &Path) -> Result<Self, String> {
        let path = root_dir.join("config.toml");
        if !path.exists() {
            let default_config = IndexerConfig::default();
            info!(
                "Config file {} does not exist. Using default configuration.",
                path.display()
            );
            if let Ok(data) = toml::to_string_pretty(&default_config) {
                info!("Default config: {}", data);
            }
            return Ok(default_config);
        }

        info!("Loading config from {}", path.display());
        let config_data = std::fs::read_to_string(&path).map_err(|e| {
            let msg = format!("Failed to read config file {}: {}", path.display(), e);
            error!("{}", msg);
            msg
        })?;

        Self::parse(&config_data).map_err(|e| {
            let msg = format!("Failed to parse config file {}: {}", path.display(), e);
            error!("{}", msg);
            msg
        })
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        let config: IndexerConfig = toml::from_str(data).map_err(|e| e.to_string())?;
        if config.query.default_items_per_page == 0
            || config.query.default_items_per_page > config.query.max_items_per_page
        {
            return Err(format!(
                "query.default_items_per_page must be in 1..={}",
                config.query.max_items_per_page
            ));
        }

        Ok(config)
    }
}

pub type IndexerConfigRef = Arc<IndexerConfig>;
