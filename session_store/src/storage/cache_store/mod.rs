mod memory;
mod redis;
mod types;

pub(crate) use types::CacheStore;

use crate::config::CacheStoreKind;
use crate::storage::errors::StorageError;
use types::{InMemoryCacheStore, RedisCacheStore};

/// Build the configured cache store backend. Called once, when the
/// server-backed session store is constructed.
pub(crate) async fn build_cache_store(
    kind: &CacheStoreKind,
) -> Result<Box<dyn CacheStore>, StorageError> {
    let store: Box<dyn CacheStore> = match kind {
        CacheStoreKind::Memory => Box::new(InMemoryCacheStore::new()),
        CacheStoreKind::Redis { url } => Box::new(RedisCacheStore::connect(url)?),
    };

    store.init().await?;
    tracing::info!("Initialized session cache store: {kind:?}");
    Ok(store)
}
