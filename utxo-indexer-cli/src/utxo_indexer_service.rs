use super::cmd::{Cli, Commands, address_asset_params, snapshot_params};
use crate::client::RpcClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use utxo_indexer::SyncPhase;
use utxo_indexer::query::Page;
use utxo_indexer::types::UtxoRecord;

pub struct UtxoIndexerService {
    client: RpcClient,
}

impl UtxoIndexerService {
    pub async fn new(url: &str) -> Result<Self, String> {
        println!("Connecting to UTXO indexer service at {}", url);
        let client = RpcClient::new(url)?;

        // Try get block height to verify connection
        let height = client.get_block_height().await?;
        match height {
            Some(height) => println!("Connected, indexed up to block {}", height),
            None => println!("Connected, no block indexed yet"),
        }

        Ok(Self { client })
    }

    pub async fn process_command(&self, cli: Cli) -> Result<(), String> {
        match cli.command {
            Commands::Height => {
                let height = self.client.get_block_height().await?;
                match height {
                    Some(height) => println!("Current Height: {}", height),
                    None => println!("Current Height: none"),
                }
            }
            Commands::Status => {
                self.process_sync_status().await?;
            }
            Commands::Stop => {
                self.client.stop().await?;
                println!("Stop command sent.");
            }
            Commands::Utxo {
                filter,
                position,
                items_per_page,
                json,
            } => {
                let params = filter.to_params(Some(&position), items_per_page);
                let page = self.client.get_utxo(&params).await?;
                if json {
                    print_json(&page)?;
                } else {
                    UtxoFormatter::print_page(&page);
                }
            }
            Commands::Aggregate {
                filter,
                position,
                items_per_page,
            } => {
                let params = filter.to_params(Some(&position), items_per_page);
                let page = self.client.get_aggregate_utxo(&params).await?;
                print_json(&page)?;
            }
            Commands::Count { filter } => {
                let params = filter.to_params(None, None);
                let count = self.client.get_aggregate_utxo_count(&params).await?;
                println!("Aggregate count: {}", count);
            }
            Commands::AddressAggregate {
                address,
                asset_type,
                shard_id,
                only_confirmed,
                confirm_threshold,
            } => {
                let params = address_asset_params(
                    address,
                    asset_type,
                    shard_id,
                    only_confirmed,
                    confirm_threshold,
                );
                let aggregate = self.client.get_address_asset_aggregate(&params).await?;
                print_json(&aggregate)?;
            }
            Commands::Snapshot {
                asset_type,
                date,
                after,
                items_per_page,
            } => {
                let params = snapshot_params(asset_type, date, after, items_per_page);
                match self.client.get_snapshot(&params).await? {
                    Some(snapshot) => print_json(&snapshot)?,
                    None => println!("No block existed at the requested date."),
                }
            }
            Commands::Asset { asset_type } => {
                let scheme = self.client.get_asset_scheme(&asset_type).await?;
                print_json(&scheme)?;
            }
        }

        Ok(())
    }

    async fn process_sync_status(&self) -> Result<(), String> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} blocks {msg}",
        )
        .map_err(|e| {
            let msg = format!("Invalid progress template: {}", e);
            log::error!("{}", msg);
            msg
        })?;
        bar.set_style(style);

        loop {
            let status = match self.client.get_sync_status().await {
                Ok(s) => s,
                Err(e) => {
                    bar.println(format!("Failed to get sync status: {}", e));
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            bar.set_length(status.total);
            bar.set_position(status.current.min(status.total));
            bar.set_message(status.message.clone().unwrap_or_default());

            if status.phase == SyncPhase::Synced {
                bar.finish_with_message("Service is fully synced.");
                break;
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let s = serde_json::to_string_pretty(value).map_err(|e| {
        let msg = format!("Failed to format result: {}", e);
        log::error!("{}", msg);
        msg
    })?;
    println!("{}", s);
    Ok(())
}

struct UtxoFormatter;

impl UtxoFormatter {
    fn print_page(page: &Page<UtxoRecord>) {
        if page.data.is_empty() {
            println!("No unspent outputs found.");
            return;
        }

        println!("\n┌──────────┬────────────────────┬──────────────────────────┬──────────────┬───────┐");
        println!("│ Block    │ Address            │ Quantity                 │ Tx           │ Index │");
        println!("├──────────┼────────────────────┼──────────────────────────┼──────────────┼───────┤");

        for utxo in &page.data {
            println!(
                "│ {:>8} │ {:<18} │ {:>24} │ {:<12} │ {:>5} │",
                utxo.block_number,
                Self::shorten(&utxo.address, 18),
                Self::format_number(&utxo.quantity.to_string()),
                Self::shorten(&utxo.transaction_hash.to_hex(), 12),
                utxo.output_index
            );
        }

        println!("└──────────┴────────────────────┴──────────────────────────┴──────────────┴───────┘");

        if page.has_previous_page {
            if let Some(key) = &page.first_evaluated_key {
                println!("Previous page: --before {}", key);
            }
        }
        if page.has_next_page {
            if let Some(key) = &page.last_evaluated_key {
                println!("Next page: --after {}", key);
            }
        }
    }

    fn shorten(s: &str, width: usize) -> String {
        if s.chars().count() <= width {
            return s.to_string();
        }
        let head: String = s.chars().take(width - 3).collect();
        format!("{}...", head)
    }

    // Add thousand separators for better readability
    fn format_number(digits: &str) -> String {
        let mut result = String::new();
        for (i, c) in digits.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }
        result.chars().rev().collect()
    }
}
