use crate::{data::StoreSnapshot, error::Error};
use std::{
    fmt::Debug,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

pub const DEFAULT_CACHE_FILE: &str = ".cache.json";

/// Where the request store is persisted between runs.
pub trait SnapshotStore: Debug + Send + Sync {
    fn load(&self) -> Result<StoreSnapshot, Error>;
    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), Error>;
}

/// Pretty-printed JSON file holding the whole store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_CACHE_FILE.into());
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<StoreSnapshot, Error> {
        let file_contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreSnapshot::new()),
            Err(e) => return Err(e.into()),
        };

        if file_contents.trim().is_empty() {
            return Ok(StoreSnapshot::new());
        }

        serde_json::from_str(&file_contents).map_err(Error::MalformedCache)
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), Error> {
        let temp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

/// Keeps the last saved snapshot in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<StoreSnapshot>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<StoreSnapshot, Error> {
        Ok(self.snapshot.lock()?.clone())
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<(), Error> {
        *self.snapshot.lock()? = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
