use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One captured request. Built once by the capture service and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    #[serde(rename = "ts")]
    pub timestamp: String,
    pub headers: BTreeMap<String, String>,
    pub method: String,
    pub url: String,
    pub scheme: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query_params: String,
    pub body: Option<String>,
    pub json: Option<serde_json::Value>,
}

/// Store key. Flat mode always uses the empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub namespace: String,
    pub path: String,
}

impl RequestKey {
    pub fn new<S1: Into<String>, S2: AsRef<str>>(namespace: S1, path: S2) -> Self {
        Self {
            namespace: namespace.into(),
            path: normalize_path(path),
        }
    }

    pub fn flat<S: AsRef<str>>(path: S) -> Self {
        Self::new("", path)
    }

    /// Path registered in the path cache for this key.
    pub fn full_path(&self) -> String {
        join_path(&self.namespace, &self.path)
    }
}

/// Serialized form of the request store, as written to the cache file.
pub type StoreSnapshot = HashMap<String, HashMap<String, Vec<RequestSnapshot>>>;

/// Drops empty segments so `/a//b/` and `a/b` name the same path.
pub fn normalize_path<S: AsRef<str>>(path: S) -> String {
    path.as_ref()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.into(),
        (false, true) => prefix.into(),
        (false, false) => format!("{}/{}", prefix, path),
    }
}
