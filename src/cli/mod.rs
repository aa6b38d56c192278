pub mod catalog;
pub mod config;
pub mod import;
pub mod init;
pub mod outcomes;
pub mod query;
pub mod recommend;
pub mod serve;
pub mod session;

use std::sync::Arc;

use bookshop_search::config::ShopConfig;
use bookshop_search::network::client::RemoteQueryClient;
use bookshop_search::query::{BookQueryService, CatalogExecutor};
use bookshop_search::storage::manager::StorageManager;

/// Local executor over the configured catalog, or the socket client.
pub fn query_service(config: &ShopConfig, remote: bool) -> Arc<dyn BookQueryService> {
    if remote {
        Arc::new(RemoteQueryClient::new(config.server.socket_path()))
    } else {
        let storage = StorageManager::new(&config.storage);
        Arc::new(
            CatalogExecutor::new(storage.catalog())
                .with_limit(config.retrieval.effective_candidate_limit()),
        )
    }
}
