
// Service names
pub const UTXO_INDEXER_SERVICE_NAME: &str = "utxo-indexer";
pub const UTXO_INDEXER_CLI_TOOL_NAME: &str = "utxo-indexer-cli";

// Directory constants
pub const INDEXER_ROOT_DIR: &str = ".utxo-indexer";

// Service http ports
pub const UTXO_INDEXER_SERVICE_HTTP_PORT: u16 = 8098;
