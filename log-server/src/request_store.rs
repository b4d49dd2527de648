use crate::data::{RequestKey, RequestSnapshot, StoreSnapshot};
use std::collections::HashMap;

/// Append-only history of captured requests, grouped by namespace and path.
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    requests: StoreSnapshot,
    // keys in the order they were first captured
    order: Vec<RequestKey>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from its persisted form. Key order is recovered from
    /// the timestamp of the first request captured under each key.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut order = snapshot
            .iter()
            .flat_map(|(namespace, paths)| {
                paths
                    .iter()
                    .filter(|(_, requests)| !requests.is_empty())
                    .map(move |(path, requests)| {
                        (
                            requests[0].timestamp.clone(),
                            RequestKey {
                                namespace: namespace.clone(),
                                path: path.clone(),
                            },
                        )
                    })
            })
            .collect::<Vec<_>>();
        order.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        let mut requests = snapshot;
        for paths in requests.values_mut() {
            paths.retain(|_, requests| !requests.is_empty());
        }
        requests.retain(|_, paths| !paths.is_empty());

        Self {
            requests,
            order: order.into_iter().map(|(_, key)| key).collect(),
        }
    }

    pub fn append(&mut self, key: &RequestKey, snapshot: RequestSnapshot) {
        let requests = self
            .requests
            .entry(key.namespace.clone())
            .or_insert_with(HashMap::new)
            .entry(key.path.clone())
            .or_insert_with(Vec::new);

        if requests.is_empty() {
            self.order.push(key.clone());
        }
        requests.push(snapshot);
    }

    /// All requests captured under `key`, oldest first.
    pub fn get(&self, key: &RequestKey) -> &[RequestSnapshot] {
        self.requests
            .get(&key.namespace)
            .and_then(|paths| paths.get(&key.path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The last `limit` requests captured under `key`, newest first.
    pub fn recent(&self, key: &RequestKey, limit: usize) -> Vec<RequestSnapshot> {
        self.get(key).iter().rev().take(limit).cloned().collect()
    }

    pub fn keys(&self) -> &[RequestKey] {
        &self.order
    }

    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = Vec::new();
        for key in &self.order {
            if !namespaces.contains(&key.namespace.as_str()) {
                namespaces.push(&key.namespace);
            }
        }
        namespaces
    }

    pub fn len(&self) -> usize {
        self.requests
            .values()
            .flat_map(|paths| paths.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.order.clear();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.requests.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(timestamp: &str, path: &str) -> RequestSnapshot {
        RequestSnapshot {
            timestamp: timestamp.into(),
            headers: BTreeMap::new(),
            method: "GET".into(),
            url: format!("http://localhost{}", path),
            scheme: "http".into(),
            hostname: Some("localhost".into()),
            port: None,
            path: path.into(),
            query_params: String::new(),
            body: Some(String::new()),
            json: None,
        }
    }

    #[test]
    fn unknown_key_is_empty() {
        let store = RequestStore::new();

        assert!(store.get(&RequestKey::new("id", "a")).is_empty());
        assert!(store.recent(&RequestKey::new("id", "a"), 10).is_empty());
    }

    #[test]
    fn append_only_touches_its_key() {
        let mut store = RequestStore::new();
        let a = RequestKey::new("id", "a");
        let b = RequestKey::new("id", "b");

        store.append(&a, request("1", "/i/id/a"));
        store.append(&b, request("2", "/i/id/b"));
        store.append(&a, request("3", "/i/id/a"));

        assert_eq!(store.get(&a).len(), 2);
        assert_eq!(store.get(&b).len(), 1);
        assert_eq!(store.len(), 3);
        assert_eq!(store.keys(), &[a, b]);
    }

    #[test]
    fn recent_is_truncated_and_newest_first() {
        let mut store = RequestStore::new();
        let key = RequestKey::flat("a");

        for n in 1..=15 {
            store.append(&key, request(&format!("{:02}", n), "/i/a"));
        }

        let timestamps = store
            .recent(&key, 10)
            .into_iter()
            .map(|r| r.timestamp)
            .collect::<Vec<_>>();
        let expected = (6..=15)
            .rev()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>();

        assert_eq!(timestamps, expected);
    }

    #[test]
    fn namespaces_in_first_capture_order() {
        let mut store = RequestStore::new();
        store.append(&RequestKey::new("second", "x"), request("1", "/"));
        store.append(&RequestKey::new("first", "y"), request("2", "/"));
        store.append(&RequestKey::new("second", "z"), request("3", "/"));

        assert_eq!(store.namespaces(), vec!["second", "first"]);
    }

    #[test]
    fn from_snapshot_restores_capture_order() {
        let mut store = RequestStore::new();
        store.append(&RequestKey::new("n", "late"), request("2024-01-02", "/"));
        store.append(&RequestKey::new("m", "early"), request("2024-01-01", "/"));
        let mut snapshot = store.snapshot();
        snapshot
            .entry("n".into())
            .or_default()
            .insert("empty".into(), Vec::new());

        let restored = RequestStore::from_snapshot(snapshot);

        assert_eq!(
            restored.keys(),
            &[RequestKey::new("m", "early"), RequestKey::new("n", "late")]
        );
        assert!(restored.get(&RequestKey::new("n", "empty")).is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let mut store = RequestStore::new();
        store.append(&RequestKey::flat("a"), request("1", "/i/a"));
        store.clear();

        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }
}
