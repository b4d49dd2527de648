#[cfg(test)]
mod tests {
    use log_server::{CaptureService, LogServerConfiguration, ServerHandle, StoreMode};
    use serde_json::Value;
    use std::{net::SocketAddr, path::Path, sync::Arc};

    fn start_server(mode: StoreMode, cache_file: &Path) -> ServerHandle {
        let mut configuration = LogServerConfiguration::new(mode);
        configuration.set_cache_file(cache_file);
        let service = Arc::new(CaptureService::from_configuration(configuration));

        log_server::spawn(service, SocketAddr::from(([127, 0, 0, 1], 0))).unwrap()
    }

    async fn get_json(server: &ServerHandle, path: &str) -> Value {
        let response = reqwest::get(format!("http://{}{}", server.local_addr(), path))
            .await
            .unwrap();
        assert!(response.status().is_success(), "GET {} failed", path);

        response.json().await.unwrap()
    }

    #[tokio::test]
    async fn root_describes_the_server() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Namespaced, &dir.path().join(".cache.json"));

        let root = get_json(&server, "/").await;

        assert_eq!(root["/"], "/");
        assert!(root["*"].as_array().unwrap().len() > 0);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn capture_then_view_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Flat, &dir.path().join(".cache.json"));

        get_json(&server, "/_clear").await;
        let captured = get_json(&server, "/i/test").await;
        assert_eq!(captured["o"], "/o/test");

        let viewed = get_json(&server, "/o/test").await;
        let requests = viewed["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["method"], "GET");
        assert_eq!(requests[0]["path"], "/i/test");
        assert_eq!(requests[0]["ts"], captured["ts"]);
        assert_eq!(viewed["*"], serde_json::json!([]));

        let cleared = get_json(&server, "/_clear").await;
        assert_eq!(cleared["message"], "cleared");

        let viewed = get_json(&server, "/o/test").await;
        assert_eq!(viewed["requests"].as_array().unwrap().len(), 0);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn namespaced_capture_of_a_json_body() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Namespaced, &dir.path().join(".cache.json"));
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/i/hook/events/push?x=1", server.local_addr()))
            .json(&serde_json::json!({ "ref": "main" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let ids = get_json(&server, "/o").await;
        assert_eq!(ids["ids"], serde_json::json!(["hook"]));

        let paths = get_json(&server, "/o/hook").await;
        assert_eq!(paths["paths"], serde_json::json!(["events", "events/push"]));

        let viewed = get_json(&server, "/o/hook/events/push").await;
        let request = &viewed["requests"][0];
        assert_eq!(request["method"], "POST");
        assert_eq!(request["json"]["ref"], "main");
        assert!(request["body"].is_null());
        assert_eq!(request["query_params"], "x=1");
        assert_eq!(viewed[".."], "/o/hook/events");

        drop(client);
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_json_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Flat, &dir.path().join(".cache.json"));
        let client = reqwest::Client::new();

        let response = client
            .put(format!("http://{}/i/broken", server.local_addr()))
            .header("content-type", "application/json")
            .body("{ not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        drop(client);

        let viewed = get_json(&server, "/o/broken").await;
        assert_eq!(viewed["requests"].as_array().unwrap().len(), 0);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn wildcard_listings() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Flat, &dir.path().join(".cache.json"));

        for path in &["a/b", "a/c", "a/b/d"] {
            get_json(&server, &format!("/i/{}", path)).await;
        }

        let children = get_json(&server, "/o/a/*").await;
        assert_eq!(children["*"], serde_json::json!(["/o/a/b", "/o/a/c"]));

        let subtree = get_json(&server, "/o/a/**").await;
        assert_eq!(
            subtree["*"],
            serde_json::json!(["/o/a/b", "/o/a/b/d", "/o/a/c"])
        );

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn captures_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let cache_file = dir.path().join(".cache.json");

        let server = start_server(StoreMode::Namespaced, &cache_file);
        for _ in 0..3 {
            get_json(&server, "/i/id/a").await;
        }
        server.shutdown().await.unwrap();

        let server = start_server(StoreMode::Namespaced, &cache_file);
        let viewed = get_json(&server, "/o/id/a").await;
        assert_eq!(viewed["requests"].as_array().unwrap().len(), 3);

        let db = get_json(&server, "/_db").await;
        assert_eq!(db["path_cache"], serde_json::json!({ "id": { "a": {} } }));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = start_server(StoreMode::Namespaced, &dir.path().join(".cache.json"));

        let response = reqwest::get(format!("http://{}/nowhere", server.local_addr()))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown().await.unwrap();
    }
}
