use clap::{Args, Parser, Subcommand};
use indexer_util::UTXO_INDEXER_SERVICE_HTTP_PORT;
use utxo_indexer::query::{AddressAssetParams, SnapshotParams, UtxoQueryParams};

#[derive(Parser)]
#[command(name = "utxo-indexer-cli")]
#[command(about = "UTXO indexer JSON-RPC client")]
pub struct Cli {
    #[arg(short, long, default_value_t = format!("http://127.0.0.1:{}", UTXO_INDEXER_SERVICE_HTTP_PORT))]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get latest indexed block number
    Height,

    /// Get sync status and keep displaying updates until synced
    Status,

    /// Stop the utxo indexer service
    Stop,

    /// List unspent outputs
    Utxo {
        #[clap(flatten)]
        filter: FilterArgs,

        #[clap(flatten)]
        position: PagePosition,

        #[arg(long, value_name = "N")]
        items_per_page: Option<usize>,

        /// Print the raw JSON page instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List per address and asset type totals
    Aggregate {
        #[clap(flatten)]
        filter: FilterArgs,

        #[clap(flatten)]
        position: PagePosition,

        #[arg(long, value_name = "N")]
        items_per_page: Option<usize>,
    },

    /// Count the groups `aggregate` pages through
    Count {
        #[clap(flatten)]
        filter: FilterArgs,
    },

    /// Get totals of one address for one asset type
    AddressAggregate {
        #[arg(value_name = "ADDRESS")]
        address: String,

        #[arg(value_name = "ASSET_TYPE")]
        asset_type: String,

        #[arg(long, value_name = "SHARD_ID")]
        shard_id: Option<u16>,

        #[arg(long, default_value_t = false)]
        only_confirmed: bool,

        #[arg(long, value_name = "BLOCKS")]
        confirm_threshold: Option<u64>,
    },

    /// Get the UTXO set of an asset type at a point in time
    Snapshot {
        #[arg(value_name = "ASSET_TYPE")]
        asset_type: String,

        /// RFC 3339 date-time, YYYY-MM-DD or unix seconds
        #[arg(value_name = "DATE")]
        date: String,

        /// lastEvaluatedKey of the previous page
        #[arg(long, value_name = "KEY")]
        after: Option<String>,

        #[arg(long, value_name = "N")]
        items_per_page: Option<usize>,
    },

    /// Get the registered scheme of an asset type
    Asset {
        #[arg(value_name = "ASSET_TYPE")]
        asset_type: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<String>,

    #[arg(long, value_name = "ASSET_TYPE")]
    pub asset_type: Option<String>,

    #[arg(long, value_name = "SHARD_ID")]
    pub shard_id: Option<u16>,

    /// Hide outputs of the most recent blocks
    #[arg(long, default_value_t = false)]
    pub only_confirmed: bool,

    #[arg(long, value_name = "BLOCKS")]
    pub confirm_threshold: Option<u64>,

    /// Wait for the service to catch up with the node first
    #[arg(long, default_value_t = false)]
    pub sync: bool,
}

#[derive(Args, Debug, Clone)]
#[group(required = false, multiple = false)]
pub struct PagePosition {
    /// firstEvaluatedKey of the current page, fetches the page before it
    #[arg(long, value_name = "KEY")]
    pub before: Option<String>,

    /// lastEvaluatedKey of the current page, fetches the page after it
    #[arg(long, value_name = "KEY")]
    pub after: Option<String>,
}

fn flag(value: bool) -> Option<bool> {
    if value { Some(true) } else { None }
}

impl FilterArgs {
    pub fn to_params(&self, position: Option<&PagePosition>, items_per_page: Option<usize>) -> UtxoQueryParams {
        UtxoQueryParams {
            address: self.address.clone(),
            asset_type: self.asset_type.clone(),
            shard_id: self.shard_id,
            only_confirmed: flag(self.only_confirmed),
            confirm_threshold: self.confirm_threshold,
            first_evaluated_key: position.and_then(|p| p.before.clone()),
            last_evaluated_key: position.and_then(|p| p.after.clone()),
            items_per_page,
            sync: flag(self.sync),
        }
    }
}

pub fn address_asset_params(
    address: String,
    asset_type: String,
    shard_id: Option<u16>,
    only_confirmed: bool,
    confirm_threshold: Option<u64>,
) -> AddressAssetParams {
    AddressAssetParams {
        address,
        asset_type,
        shard_id,
        only_confirmed: flag(only_confirmed),
        confirm_threshold,
        sync: None,
    }
}

pub fn snapshot_params(
    asset_type: String,
    date: String,
    after: Option<String>,
    items_per_page: Option<usize>,
) -> SnapshotParams {
    SnapshotParams {
        asset_type,
        date,
        first_evaluated_key: None,
        last_evaluated_key: after,
        items_per_page,
        sync: None,
    }
}
