//! File-persisted storage engine.
//!
//! [`FileEngine`] decorates another engine (by default a [`MemoryEngine`]) and writes its
//! complete record set to a JSON file after every committed mutation. The file holds a
//! single object mapping identity values to records, and is read back as the initial data
//! when the engine is built.
//!
//! Snapshots are written to a temporary sibling file and renamed into place, so the file is
//! always either the previous or the new complete snapshot. Flushes are serialized, and each
//! one captures the state at the time it runs, so the last flush to finish reflects the
//! latest committed state.

use async_trait::async_trait;
use mea::mutex::Mutex;
use std::{
    ffi::OsString,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, warn};

use docstore_core::{
    engine::{EngineBuilder, Snapshot, StorageEngine, UpdateMode},
    error::{DocumentStoreError, DocumentStoreResult},
    event::Observer,
    query::{FindOptions, Query},
    record::{DEFAULT_ID_PROPERTY, Record, RecordId},
    snapshot::SnapshotData,
};
use docstore_memory::MemoryEngine;

/// Default location of the snapshot file.
pub const DEFAULT_PATH: &str = "./save.json";

pub struct FileEngine<E = MemoryEngine> {
    inner: E,
    path: PathBuf,
    temp_path: PathBuf,
    pretty: bool,
    flush_lock: Mutex<()>,
}

impl FileEngine<MemoryEngine> {
    /// Creates a builder for a file engine backed by a [`MemoryEngine`].
    pub fn builder() -> FileEngineBuilder {
        FileEngineBuilder::default()
    }
}

impl<E: StorageEngine + Snapshot> FileEngine<E> {
    /// Decorates `inner`, persisting its records to `path`.
    ///
    /// Existing file contents are not loaded; use [`FileEngine::builder`] for that.
    pub fn new(inner: E, path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let mut temp_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("save.json"));
        temp_name.push(".tmp");

        Self {
            temp_path: path.with_file_name(temp_name),
            inner,
            path,
            pretty: false,
            flush_lock: Mutex::new(()),
        }
    }

    /// Writes pretty-printed JSON instead of compact JSON.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Writes the wrapped engine's current snapshot to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub async fn flush(&self) -> DocumentStoreResult<()> {
        let _guard = self.flush_lock.lock().await;

        let data = self.inner.get_data().await?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&data)?
        } else {
            serde_json::to_vec(&data)?
        };

        fs::write(&self.temp_path, bytes)
            .and_then(|_| fs::rename(&self.temp_path, &self.path))
            .map_err(|error| {
                warn!(path = %self.path.display(), %error, "unable to write snapshot");
                DocumentStoreError::Io(format!("{}: {error}", self.path.display()))
            })?;

        debug!(path = %self.path.display(), records = data.len(), "snapshot written");

        Ok(())
    }
}

impl<E: fmt::Debug> fmt::Debug for FileEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEngine")
            .field("inner", &self.inner)
            .field("path", &self.path)
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: StorageEngine + Snapshot> StorageEngine for FileEngine<E> {
    fn id_property(&self) -> &str {
        self.inner.id_property()
    }

    async fn create(&self, record: Record) -> DocumentStoreResult<Record> {
        let stored = self.inner.create(record).await?;
        self.flush().await?;
        Ok(stored)
    }

    async fn read(&self, id: RecordId) -> DocumentStoreResult<Option<Record>> {
        self.inner.read(id).await
    }

    async fn update(&self, record: Record, mode: UpdateMode) -> DocumentStoreResult<Record> {
        let saved = self.inner.update(record, mode).await?;
        self.flush().await?;
        Ok(saved)
    }

    async fn delete(&self, id: RecordId) -> DocumentStoreResult<()> {
        self.inner.delete(id).await?;
        self.flush().await
    }

    async fn delete_many(&self, query: Query) -> DocumentStoreResult<usize> {
        let deleted = self.inner.delete_many(query).await?;
        self.flush().await?;
        Ok(deleted)
    }

    async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<Record>> {
        self.inner.find(query, options).await
    }

    async fn find_one(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Record>> {
        self.inner.find_one(query, options).await
    }

    async fn count(&self, query: Query) -> DocumentStoreResult<usize> {
        self.inner.count(query).await
    }

    async fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.inner.subscribe(observer).await
    }
}

#[async_trait]
impl<E: StorageEngine + Snapshot> Snapshot for FileEngine<E> {
    async fn get_data(&self) -> DocumentStoreResult<SnapshotData> {
        self.inner.get_data().await
    }
}

/// Reads a snapshot file. A missing or blank file is an empty snapshot.
fn load(path: &Path) -> DocumentStoreResult<SnapshotData> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(SnapshotData::new()),
        Err(error) => {
            return Err(DocumentStoreError::Io(format!("{}: {error}", path.display())));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(SnapshotData::new());
    }

    serde_json::from_slice(&bytes).map_err(|error| {
        DocumentStoreError::Serialization(format!("{}: {error}", path.display()))
    })
}

/// Builder for [`FileEngine`] instances backed by a [`MemoryEngine`].
///
/// # Example
///
/// ```ignore
/// use docstore_file::FileEngine;
///
/// let engine = FileEngine::builder()
///     .path("data/contacts.json")
///     .pretty(true)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct FileEngineBuilder {
    path: PathBuf,
    id_property: String,
    pretty: bool,
}

impl Default for FileEngineBuilder {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            pretty: false,
        }
    }
}

impl FileEngineBuilder {
    /// Sets the snapshot file location.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the name of the identity property.
    pub fn id_property(mut self, id_property: impl Into<String>) -> Self {
        self.id_property = id_property.into();
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[async_trait]
impl EngineBuilder for FileEngineBuilder {
    type Engine = FileEngine<MemoryEngine>;

    async fn build(self) -> DocumentStoreResult<Self::Engine> {
        let data = load(&self.path)?;

        debug!(path = %self.path.display(), records = data.len(), "snapshot loaded");

        let inner = MemoryEngine::builder()
            .id_property(self.id_property)
            .data(data)
            .build()
            .await?;

        Ok(FileEngine::new(inner, self.path).pretty(self.pretty))
    }
}
