use std::collections::BTreeMap;

use serde_json::Value;

use crate::session::errors::SessionError;

/// The session payload: string keys to JSON values. A `BTreeMap` keeps the
/// encoded form deterministic regardless of insertion order.
pub type SessionMap = BTreeMap<String, Value>;

pub(crate) fn encode(map: &SessionMap) -> Result<Vec<u8>, SessionError> {
    serde_json::to_vec(map).map_err(|e| SessionError::Decode(e.to_string()))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<SessionMap, SessionError> {
    serde_json::from_slice(bytes).map_err(|e| SessionError::Decode(e.to_string()))
}
