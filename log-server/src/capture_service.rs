use crate::{
    configuration::{LogServerConfiguration, StoreMode},
    data::{RequestKey, RequestSnapshot, StoreSnapshot},
    debounce::Debouncer,
    error::Error,
    inbound::InboundRequest,
    path_cache::PathCache,
    persistence::{JsonFileStore, SnapshotStore},
    request_store::RequestStore,
    util,
};
use chrono::{SecondsFormat, Utc};
use hyper::body::Bytes;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Default)]
struct CaptureState {
    requests: RequestStore,
    paths: PathCache,
}

impl CaptureState {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let requests = RequestStore::from_snapshot(snapshot);
        let mut paths = PathCache::new();
        for key in requests.keys() {
            paths.register(key.full_path());
        }

        Self { requests, paths }
    }
}

/// Writes the current store through the persistence adapter. Cloned into debounced actions.
#[derive(Debug, Clone)]
struct Saver {
    state: Arc<RwLock<CaptureState>>,
    persistence: Arc<dyn SnapshotStore>,
    save_lock: Arc<Mutex<()>>,
}

impl Saver {
    fn save(&self) {
        if let Err(e) = self.try_save() {
            error!("Couldn't save the request cache: {}", e);
        }
    }

    fn try_save(&self) -> Result<(), Error> {
        let _save_guard = self.save_lock.lock()?;
        let snapshot = self.state.read()?.requests.snapshot();
        self.persistence.save(&snapshot)?;
        debug!("Saved {} namespaces to the request cache", snapshot.len());

        Ok(())
    }
}

/// Owns the request store and the path cache, and keeps the persisted copy up to date.
#[derive(Debug)]
pub struct CaptureService {
    configuration: LogServerConfiguration,
    state: Arc<RwLock<CaptureState>>,
    debouncer: Debouncer,
    saver: Saver,
}

impl CaptureService {
    /// Opens the service on the configured cache file.
    pub fn from_configuration(configuration: LogServerConfiguration) -> Self {
        let persistence = JsonFileStore::new(configuration.cache_file().clone());
        info!("Using request cache {}", persistence.path().display());
        Self::open(configuration, Arc::new(persistence))
    }

    /// Loads whatever `persistence` holds. A cache that can't be read is logged and
    /// replaced by an empty store on the next save.
    pub fn open(configuration: LogServerConfiguration, persistence: Arc<dyn SnapshotStore>) -> Self {
        let snapshot = match persistence.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Starting with an empty request cache: {}", e);
                StoreSnapshot::new()
            }
        };

        let state = CaptureState::from_snapshot(snapshot);
        info!(
            "Loaded {} captured requests under {} keys in {} namespaces",
            state.requests.len(),
            state.requests.keys().len(),
            state.requests.namespaces().len()
        );

        let state = Arc::new(RwLock::new(state));
        let saver = Saver {
            state: state.clone(),
            persistence,
            save_lock: Arc::new(Mutex::new(())),
        };

        let debouncer = Debouncer::new(configuration.debounce_window());
        info!("Saving captures at most once per {:?}", debouncer.window());

        Self {
            debouncer,
            configuration,
            state,
            saver,
        }
    }

    pub fn configuration(&self) -> &LogServerConfiguration {
        &self.configuration
    }

    pub fn mode(&self) -> StoreMode {
        self.configuration.mode()
    }

    /// Maps a path below `/i/` or `/o/` onto a store key.
    pub fn key_for<S: AsRef<str>>(&self, path: S) -> RequestKey {
        match self.mode() {
            StoreMode::Flat => RequestKey::flat(path),
            StoreMode::Namespaced => {
                let path = path.as_ref().trim_start_matches('/');
                match path.split_once('/') {
                    Some((id, rest)) => RequestKey::new(id, rest),
                    None => RequestKey::new(path, ""),
                }
            }
        }
    }

    /// Records `request` under `key` and schedules a save.
    ///
    /// The body is read and decoded before any state is touched, so a request
    /// whose JSON body doesn't parse leaves the store unchanged.
    pub async fn capture_request<R: InboundRequest + ?Sized>(
        &self,
        key: &RequestKey,
        request: &mut R,
    ) -> Result<RequestSnapshot, Error> {
        let body = request.read_body().await?;
        let snapshot = snapshot_request(request.method(), request.url()?, request.headers(), body)?;

        {
            let mut state = self.state.write()?;
            state.requests.append(key, snapshot.clone());
            state.paths.register(key.full_path());
        }
        debug!(
            "Captured {} {} under {:?}",
            snapshot.method, snapshot.path, key
        );

        let saver = self.saver.clone();
        self.debouncer.trigger(move || saver.save());

        Ok(snapshot)
    }

    /// The most recent captures for `key`, newest first.
    pub fn recent_requests(&self, key: &RequestKey) -> Result<Vec<RequestSnapshot>, Error> {
        Ok(self
            .state
            .read()?
            .requests
            .recent(key, self.configuration.history_limit()))
    }

    /// Resolves a path or wildcard query against the path cache.
    pub fn subpaths<S: AsRef<str>>(&self, query: S) -> Result<Vec<String>, Error> {
        Ok(self.state.read()?.paths.resolve_wildcard_query(query))
    }

    /// Top level names of the path cache: identifiers in namespaced mode, first segments in flat mode.
    pub fn identifiers(&self) -> Result<Vec<String>, Error> {
        Ok(self.state.read()?.paths.list_immediate_children(""))
    }

    pub fn paths_under<S: AsRef<str>>(&self, id: S) -> Result<Vec<String>, Error> {
        let id = id.as_ref();
        if id.trim_matches('/').is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.state.read()?.paths.list_all_descendants(id))
    }

    pub fn store_snapshot(&self) -> Result<StoreSnapshot, Error> {
        Ok(self.state.read()?.requests.snapshot())
    }

    pub fn path_cache_snapshot(&self) -> Result<PathCache, Error> {
        Ok(self.state.read()?.paths.clone())
    }

    /// Drops every capture and writes the empty store right away.
    pub fn clear(&self) -> Result<(), Error> {
        {
            let mut state = self.state.write()?;
            state.requests.clear();
            state.paths.clear();
        }
        info!("Cleared the request cache");

        self.flush();
        Ok(())
    }

    /// Writes the current store right away, bypassing the debounce window.
    pub fn flush(&self) {
        let saver = self.saver.clone();
        self.debouncer.flush(move || saver.save());
    }
}

fn snapshot_request(
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
    body: Bytes,
) -> Result<RequestSnapshot, Error> {
    let headers = util::collapse_headers(headers);
    let (body, json) = if util::is_json_content_type(&headers) {
        let json = serde_json::from_slice(&body).map_err(Error::InvalidJsonBody)?;
        (None, Some(json))
    } else {
        (Some(String::from_utf8_lossy(&body).into_owned()), None)
    };

    Ok(RequestSnapshot {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        headers,
        method: method.to_uppercase(),
        scheme: url.scheme().into(),
        hostname: url.host_str().map(String::from),
        port: url.port(),
        path: url.path().into(),
        query_params: url.query().unwrap_or("").into(),
        url: url.into(),
        body,
        json,
    })
}
