use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one action execution, as seen by templates.
///
/// A response yields `{status, headers, success, data}`; a transport failure
/// yields `{success: false, error, status: 500}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseRecord {
    pub fn response(status: u16, headers: HashMap<String, String>, data: Value) -> Self {
        Self {
            status,
            success: status < 400,
            headers: Some(headers),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: 500,
            success: false,
            headers: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Session-scoped results of prior actions, keyed by `store_response_as`.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct ActionResultStore {
    inner: Arc<RwLock<HashMap<String, ResponseRecord>>>,
}

impl ActionResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any previous one under the same key.
    pub fn insert(&self, key: impl Into<String>, record: ResponseRecord) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key.into(), record);
        }
    }

    pub fn get(&self, key: &str) -> Option<ResponseRecord> {
        self.inner.read().ok().and_then(|map| map.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot as a JSON object for the template `actions` namespace.
    pub fn to_json(&self) -> Value {
        let map = match self.inner.read() {
            Ok(map) => map,
            Err(_) => return Value::Object(Map::new()),
        };
        let object = map
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect();
        Value::Object(object)
    }
}
