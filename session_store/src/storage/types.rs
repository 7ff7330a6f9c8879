use serde::{Deserialize, Serialize};

/// Value stored in the cache store. An opaque string from the store's point
/// of view; the session layer puts codec output in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheData {
    pub(crate) value: String,
}
