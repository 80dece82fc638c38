mod client;
mod cmd;
mod utxo_indexer_service;

use clap::Parser;
use cmd::Cli;
use utxo_indexer_service::UtxoIndexerService;

#[tokio::main]
async fn main() {
    let log_config = indexer_util::LogConfig::new(indexer_util::UTXO_INDEXER_CLI_TOOL_NAME)
        .enable_file(false)
        .enable_console(true);

    let _logger = match indexer_util::init_log(log_config) {
        Ok(handle) => handle,
        Err(e) => {
            println!("Failed to init logging: {}", e);
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();
    let service = match UtxoIndexerService::new(&cli.url).await {
        Ok(service) => service,
        Err(e) => {
            println!("Failed to connect to UTXO indexer service: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = service.process_command(cli).await {
        let msg = format!("Error processing command: {}", e);
        println!("{}", msg);
        std::process::exit(1);
    }
}
