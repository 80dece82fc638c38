use super::rpc::*;
use crate::config::IndexerConfigRef;
use crate::error::{QueryError, QueryResult};
use crate::query::{
    AddressAssetParams, Page, QueryEngine, QueryEngineRef, SnapshotPage, SnapshotParams,
    UtxoQueryParams, parse_asset_type,
};
use crate::status::{SyncStatus, SyncStatusManagerRef};
use crate::sync::{SyncWorkerRef, ensure_synced};
use crate::types::{AggregateUtxo, AssetScheme, UtxoRecord};
use futures::FutureExt;
use jsonrpc_core::IoHandler;
use jsonrpc_core::{BoxFuture, Error as JsonError, ErrorCode, Result as JsonResult};
use jsonrpc_http_server::{AccessControlAllowOrigin, DomainsValidation, ServerBuilder};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct UtxoIndexerRpcServer {
    config: IndexerConfigRef,
    status: SyncStatusManagerRef,
    engine: QueryEngineRef,
    worker: SyncWorkerRef,
    shutdown_tx: watch::Sender<()>,
    server_handle: Arc<Mutex<Option<jsonrpc_http_server::CloseHandle>>>,
}

impl UtxoIndexerRpcServer {
    pub fn new(
        config: IndexerConfigRef,
        status: SyncStatusManagerRef,
        engine: QueryEngineRef,
        worker: SyncWorkerRef,
        shutdown_tx: watch::Sender<()>,
    ) -> Self {
        Self {
            config,
            status,
            engine,
            worker,
            shutdown_tx,
            server_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Must be called from within the tokio runtime, request futures are
    /// executed on it.
    pub fn start(
        config: IndexerConfigRef,
        status: SyncStatusManagerRef,
        engine: QueryEngineRef,
        worker: SyncWorkerRef,
        shutdown_tx: watch::Sender<()>,
    ) -> Result<Self, String> {
        let ret = Self::new(config.clone(), status, engine, worker, shutdown_tx);

        let mut io = IoHandler::new();
        io.extend_with(ret.clone().to_delegate());

        let addr = format!("127.0.0.1:{}", config.rpc_server.port)
            .parse()
            .map_err(|e| {
                let msg = format!("Failed to parse RPC server address: {}", e);
                error!("{}", msg);
                msg
            })?;

        let server = ServerBuilder::new(io)
            .event_loop_executor(tokio::runtime::Handle::current())
            .cors(DomainsValidation::AllowOnly(vec![
                AccessControlAllowOrigin::Any,
            ]))
            .start_http(&addr)
            .map_err(|e| {
                let msg = format!("Unable to start RPC server: {}", e);
                error!("{}", msg);
                msg
            })?;

        let handle = server.close_handle();
        info!("RPC server listening on {}", addr);
        tokio::task::spawn_blocking(move || {
            server.wait();
        });

        {
            let mut current = ret.server_handle.lock().unwrap();
            if current.is_some() {
                let msg = "RPC server is already running".to_string();
                error!("{}", msg);
                return Err(msg);
            }
            *current = Some(handle);
        }

        Ok(ret)
    }

    pub fn get_listen_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.rpc_server.port)
    }

    pub async fn close(&self) {
        let handle = self.server_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            info!("Closing RPC server.");
            if let Err(e) = tokio::task::spawn_blocking(move || {
                handle.close();
            })
            .await
            {
                error!("Failed to close RPC server: {}", e);
            }

            tokio::time::sleep(Duration::from_millis(500)).await;
            info!("RPC server closed.");
        } else {
            warn!("RPC server handle not found.");
        }
    }

    /// Runs `f` on the blocking pool after the optional sync step.
    ///
    /// `checked` is the outcome of parsing the request. A rejected request
    /// fails right away and never waits on the worker.
    fn run_query<T, F>(
        &self,
        method: &'static str,
        checked: QueryResult<()>,
        sync: bool,
        f: F,
    ) -> BoxFuture<JsonResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&QueryEngine) -> QueryResult<T> + Send + 'static,
    {
        if let Err(e) = checked {
            debug!("Rejected {}: {}", method, e);
            return futures::future::ready(Err(to_json_error(e))).boxed();
        }

        let engine = self.engine.clone();
        let worker = self.worker.clone();
        let timeout = Duration::from_millis(self.config.query.sync_timeout_ms);

        async move {
            if sync {
                ensure_synced(worker.as_ref(), timeout)
                    .await
                    .map_err(to_json_error)?;
            }

            let ret = tokio::task::spawn_blocking(move || f(&engine))
                .await
                .map_err(|e| {
                    let msg = format!("Query task {} failed: {}", method, e);
                    error!("{}", msg);
                    to_json_error(QueryError::Storage(msg))
                })?;

            ret.map_err(|e| {
                if e.is_validation() {
                    debug!("Rejected {}: {}", method, e);
                } else {
                    error!("Failed to execute {}: {}", method, e);
                }
                to_json_error(e)
            })
        }
        .boxed()
    }
}

impl UtxoIndexerRpc for UtxoIndexerRpcServer {
    fn stop(&self) -> JsonResult<()> {
        info!("Received stop command via RPC.");
        if let Err(e) = self.shutdown_tx.send(()) {
            let msg = format!("Failed to send shutdown signal: {}", e);
            error!("{}", msg);
            return Err(JsonError {
                code: ErrorCode::InternalError,
                message: msg,
                data: None,
            });
        }

        let handle = self.server_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                info!("Closing RPC server.");
                handle.close();
            });
        } else {
            warn!("RPC server handle not found.");
        }

        Ok(())
    }

    fn get_block_height(&self) -> BoxFuture<JsonResult<Option<u64>>> {
        self.run_query("get_block_height", Ok(()), false, |engine| {
            engine.block_height()
        })
    }

    fn get_sync_status(&self) -> JsonResult<SyncStatus> {
        Ok(self.status.get_status())
    }

    fn get_utxo(&self, params: UtxoQueryParams) -> BoxFuture<JsonResult<Page<UtxoRecord>>> {
        let checked = self.engine.prepare_utxo(&params).map(|_| ());
        let sync = params.wants_sync();
        self.run_query("get_utxo", checked, sync, move |engine| {
            engine.get_utxo(&params)
        })
    }

    fn get_aggregate_utxo(
        &self,
        params: UtxoQueryParams,
    ) -> BoxFuture<JsonResult<Page<AggregateUtxo>>> {
        let checked = self.engine.prepare_aggregate(&params).map(|_| ());
        let sync = params.wants_sync();
        self.run_query("get_aggregate_utxo", checked, sync, move |engine| {
            engine.get_aggregate_utxo(&params)
        })
    }

    fn get_aggregate_utxo_count(&self, params: UtxoQueryParams) -> BoxFuture<JsonResult<u64>> {
        let checked = params.filter().map(|_| ());
        let sync = params.wants_sync();
        self.run_query("get_aggregate_utxo_count", checked, sync, move |engine| {
            engine.get_aggregate_utxo_count(&params)
        })
    }

    fn get_address_asset_aggregate(
        &self,
        params: AddressAssetParams,
    ) -> BoxFuture<JsonResult<Option<AggregateUtxo>>> {
        let checked = params.filter().map(|_| ());
        let sync = params.wants_sync();
        self.run_query("get_address_asset_aggregate", checked, sync, move |engine| {
            engine.get_address_asset_aggregate(&params)
        })
    }

    fn get_snapshot(&self, params: SnapshotParams) -> BoxFuture<JsonResult<Option<SnapshotPage>>> {
        let checked = self.engine.prepare_snapshot(&params).map(|_| ());
        let sync = params.wants_sync();
        self.run_query("get_snapshot", checked, sync, move |engine| {
            engine.get_snapshot(&params)
        })
    }

    fn get_asset_scheme(&self, asset_type: String) -> BoxFuture<JsonResult<Option<AssetScheme>>> {
        let checked = parse_asset_type(&asset_type).map(|_| ());
        self.run_query("get_asset_scheme", checked, false, move |engine| {
            engine.get_asset_scheme(&asset_type)
        })
    }
}
