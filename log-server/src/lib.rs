mod capture_service;
mod configuration;
mod data;
mod debounce;
mod error;
mod inbound;
mod path_cache;
mod persistence;
mod request_store;
mod routes;
mod runner;
mod util;

pub use capture_service::CaptureService;
pub use configuration::{LogServerConfiguration, StoreMode};
pub use data::{RequestKey, RequestSnapshot, StoreSnapshot};
pub use debounce::Debouncer;
pub use error::Error;
pub use inbound::{InboundRequest, RawRequest};
pub use path_cache::{PathCache, WildcardQuery};
pub use persistence::{JsonFileStore, MemoryStore, SnapshotStore};
pub use request_store::RequestStore;
pub use routes::Route;
pub use runner::{run, spawn, ServerHandle};
