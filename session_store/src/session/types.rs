use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::session::codec::SessionMap;
use crate::session::errors::SessionError;
use crate::storage::CacheData;

/// Per-client key-value state carried across requests.
///
/// A session starts empty, is mutated by application code during request
/// handling, and is persisted at the end of the request only when dirty.
/// The `id` is present only for server-backed sessions; cookie-backed
/// sessions have no identity beyond the cookie itself.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: Option<String>,
    data: SessionMap,
    dirty: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(id: Option<String>, data: SessionMap) -> Self {
        Self {
            id,
            data,
            dirty: false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Read a value, deserialized into the requested type. Returns `None`
    /// when the key is absent or the value does not fit the type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| SessionError::Decode(e.to_string()))?;
        self.data.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.dirty = true;
        }
        self.data.clear();
    }

    /// Force persistence on the next save even without a mutation, for
    /// touch-based expiry refresh.
    pub fn touch(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn data(&self) -> &SessionMap {
        &self.data
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drop all state and identity, leaving a fresh session.
    pub(crate) fn reset(&mut self) {
        self.id = None;
        self.data.clear();
        self.dirty = false;
    }
}

/// Persisted form of a server-backed session. Owned by the datastore; the
/// process never holds it beyond one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub(crate) id: String,
    /// Codec-encoded payload.
    pub(crate) data: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) ttl: u64,
}

impl From<SessionRecord> for CacheData {
    fn from(record: SessionRecord) -> Self {
        Self {
            value: serde_json::to_string(&record).expect("Failed to serialize SessionRecord"),
        }
    }
}

impl TryFrom<CacheData> for SessionRecord {
    type Error = SessionError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| SessionError::Decode(e.to_string()))
    }
}
