#[macro_use]
extern crate log;

use clap::{Parser, Subcommand};
use indexer_util::{LogConfig, UTXO_INDEXER_SERVICE_NAME};
use std::sync::Arc;
use utxo_indexer::UtxoIndexerRpcServer;
use utxo_indexer::config::IndexerConfig;
use utxo_indexer::db::UtxoDB;
use utxo_indexer::query::QueryEngine;
use utxo_indexer::sync::NodeTipWorker;

#[derive(Parser, Debug)]
#[command(name = "utxo-indexer")]
#[command(version = "0.1.0")]
#[command(about = "UTXO query service over an indexed asset chain", long_about = None)]
struct UtxoIndexerCli {
    #[command(subcommand)]
    command: Option<UtxoIndexerCommands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
#[command(rename_all = "kebab-case")]
enum UtxoIndexerCommands {
    /// Delete the database files, DANGEROUS: This will remove all indexed data!
    /// Use with caution.
    ClearDb {},
}

fn exit_with(msg: &str) -> ! {
    error!("{}", msg);
    println!("{}", msg);
    std::process::exit(1);
}

async fn main_run() {
    let (_lock, _guard) = match indexer_util::init_process_lock(UTXO_INDEXER_SERVICE_NAME) {
        Ok(ret) => ret,
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    };

    // Init file logging
    let log_config = LogConfig::new(UTXO_INDEXER_SERVICE_NAME).enable_console(false);
    let _logger = match indexer_util::init_log(log_config) {
        Ok(handle) => handle,
        Err(e) => {
            println!("Failed to init logging: {}", e);
            std::process::exit(1);
        }
    };

    let root_dir = indexer_util::get_service_dir(UTXO_INDEXER_SERVICE_NAME);
    info!("Using service directory: {}", root_dir.display());
    println!("Using service directory: {}", root_dir.display());

    // Load configuration
    let config = match IndexerConfig::load(&root_dir) {
        Ok(cfg) => cfg,
        Err(e) => exit_with(&format!("Failed to load config: {}", e)),
    };
    let config = Arc::new(config);

    // Open the database
    let data_dir = indexer_util::get_service_data_dir(UTXO_INDEXER_SERVICE_NAME);
    let db = match UtxoDB::new(&data_dir) {
        Ok(database) => database,
        Err(e) => exit_with(&format!("Failed to open database: {}", e)),
    };
    let db = Arc::new(db);
    println!("Database opened at {}", db.db_path().display());

    let status = Arc::new(utxo_indexer::SyncStatusManager::new());
    let worker = match NodeTipWorker::new(&config.node, &config.sync, db.clone(), status.clone()) {
        Ok(worker) => Arc::new(worker),
        Err(e) => exit_with(&format!("Failed to create sync worker: {}", e)),
    };
    let engine = Arc::new(QueryEngine::new(db.clone(), config.query.clone()));

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());

    // Start the RPC server
    let rpc_server = match UtxoIndexerRpcServer::start(
        config.clone(),
        status.clone(),
        engine,
        worker.clone(),
        shutdown_tx,
    ) {
        Ok(server) => server,
        Err(e) => exit_with(&format!("Failed to start RPC server: {}", e)),
    };
    println!("RPC server started at {}", rpc_server.get_listen_url());

    // Create a Future to wait for Ctrl+C (SIGINT) signal
    use tokio::signal;
    let sigint = signal::ctrl_c();

    // Create a Future to wait for SIGTERM signal (sent by kill command by default)
    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to create SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // On non-Unix systems, we only rely on Ctrl+C
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => {
            info!("Received Ctrl+C, shutting down...");
            println!("Shutting down...");
        }
        _ = sigterm => {
            info!("Received SIGTERM, shutting down...");
            println!("Shutting down...");
        }
        _ = shutdown_rx.changed() => {
            info!("Shutdown signal received from RPC, shutting down...");
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        _ = worker.run() => {
            warn!("Sync status loop exited.");
        }
    }

    rpc_server.close().await;

    println!("Shutdown complete.");

    // Sleep a moment to ensure all logs are flushed
    tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
}

#[tokio::main]
async fn main() {
    let cli = UtxoIndexerCli::parse();

    match cli.command {
        Some(UtxoIndexerCommands::ClearDb {}) => {
            // Init file logging
            let file_name = format!("{}_clear_db", UTXO_INDEXER_SERVICE_NAME);
            let log_config = LogConfig::new(UTXO_INDEXER_SERVICE_NAME)
                .with_file_name(&file_name)
                .enable_console(false);
            let _logger = match indexer_util::init_log(log_config) {
                Ok(handle) => handle,
                Err(e) => {
                    println!("Failed to init logging: {}", e);
                    std::process::exit(1);
                }
            };

            let data_dir = indexer_util::get_service_data_dir(UTXO_INDEXER_SERVICE_NAME);
            if let Err(e) = utxo_indexer::tool::clear_db_files(&data_dir) {
                exit_with(&format!("Failed to clear database files: {}", e));
            }
            println!("Database files cleared successfully.");
            return;
        }
        None => {}
    }

    main_run().await;
    println!("UTXO indexer service exited.");
}
