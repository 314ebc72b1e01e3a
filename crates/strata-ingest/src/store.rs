use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tracing::debug;

use strata_types::{LogicalPath, StorageLocation};

/// An in-progress write to one leaf.
///
/// Bytes become visible to readers only at [`finish`](Self::finish);
/// dropping an unfinished writer discards everything it received, which
/// is what makes multi-leaf rollback cheap — abandoned writers simply
/// never publish.
pub trait LeafWriter: Write + Send {
    /// Publish the written bytes and return how many there were.
    fn finish(self: Box<Self>) -> io::Result<u64>;
}

/// Byte sink/source owned by leaf resources.
///
/// One store instance serves every leaf; calls are keyed by the leaf's
/// [`StorageLocation`] plus the object's logical path. Implementations
/// must be safe for concurrent use across distinct keys.
pub trait LeafStore: Send + Sync {
    /// Open a writer for the replica bytes at `(location, path)`.
    fn writer(&self, location: &StorageLocation, path: &LogicalPath)
        -> io::Result<Box<dyn LeafWriter>>;

    /// Open the stored bytes for independent read-back.
    fn reader(
        &self,
        location: &StorageLocation,
        path: &LogicalPath,
    ) -> io::Result<Box<dyn Read + Send>>;

    /// Delete stored bytes. Returns `true` if they existed.
    fn remove(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool>;

    /// Whether bytes are stored at `(location, path)`.
    fn exists(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool>;
}

type MemoryKey = (StorageLocation, LogicalPath);

/// In-memory leaf store for embedding and tests.
///
/// Payloads live in a `HashMap` behind a `RwLock` as cheaply cloneable
/// [`Bytes`].
#[derive(Clone, Default)]
pub struct MemoryLeafStore {
    objects: Arc<RwLock<HashMap<MemoryKey, Bytes>>>,
}

impl MemoryLeafStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored payload, if any. Test and inspection helper.
    pub fn contents(&self, location: &StorageLocation, path: &LogicalPath) -> Option<Bytes> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(&(location.clone(), path.clone()))
            .cloned()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

struct MemoryLeafWriter {
    objects: Arc<RwLock<HashMap<MemoryKey, Bytes>>>,
    key: MemoryKey,
    buf: Vec<u8>,
}

impl Write for MemoryLeafWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LeafWriter for MemoryLeafWriter {
    fn finish(self: Box<Self>) -> io::Result<u64> {
        let len = self.buf.len() as u64;
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(self.key, Bytes::from(self.buf));
        Ok(len)
    }
}

impl LeafStore for MemoryLeafStore {
    fn writer(
        &self,
        location: &StorageLocation,
        path: &LogicalPath,
    ) -> io::Result<Box<dyn LeafWriter>> {
        Ok(Box::new(MemoryLeafWriter {
            objects: Arc::clone(&self.objects),
            key: (location.clone(), path.clone()),
            buf: Vec::new(),
        }))
    }

    fn reader(
        &self,
        location: &StorageLocation,
        path: &LogicalPath,
    ) -> io::Result<Box<dyn Read + Send>> {
        let bytes = self
            .contents(location, path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no replica bytes stored"))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn remove(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
        Ok(self
            .objects
            .write()
            .expect("lock poisoned")
            .remove(&(location.clone(), path.clone()))
            .is_some())
    }

    fn exists(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(&(location.clone(), path.clone())))
    }
}

impl std::fmt::Debug for MemoryLeafStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLeafStore")
            .field("payload_count", &self.len())
            .finish()
    }
}

/// Filesystem-backed leaf store.
///
/// Replica bytes live under `<root>/<host>/<vault_path>/<logical_path>`.
/// Writes go to a `.part` staging file that is renamed into place at
/// `finish`, so readers never observe a torn replica and an abandoned
/// writer leaves only a staging file that its drop removes.
#[derive(Clone, Debug)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn physical_path(&self, location: &StorageLocation, path: &LogicalPath) -> PathBuf {
        let mut physical = self.root.join(&location.host);
        physical.push(location.vault_path.trim_start_matches('/'));
        physical.push(path.as_string().trim_start_matches('/'));
        physical
    }
}

struct VaultWriter {
    file: Option<BufWriter<File>>,
    staging: PathBuf,
    target: PathBuf,
    written: u64,
    finished: bool,
}

impl Write for VaultWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer already closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl LeafWriter for VaultWriter {
    fn finish(mut self: Box<Self>) -> io::Result<u64> {
        let writer = self
            .file
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer already closed"))?;
        let file = writer
            .into_inner()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.staging, &self.target)?;
        self.finished = true;
        debug!(target = %self.target.display(), bytes = self.written, "replica published");
        Ok(self.written)
    }
}

impl Drop for VaultWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.file.take();
            let _ = fs::remove_file(&self.staging);
        }
    }
}

impl LeafStore for VaultStore {
    fn writer(
        &self,
        location: &StorageLocation,
        path: &LogicalPath,
    ) -> io::Result<Box<dyn LeafWriter>> {
        let target = self.physical_path(location, path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(&target);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&staging)?;
        Ok(Box::new(VaultWriter {
            file: Some(BufWriter::new(file)),
            staging,
            target,
            written: 0,
            finished: false,
        }))
    }

    fn reader(
        &self,
        location: &StorageLocation,
        path: &LogicalPath,
    ) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.physical_path(location, path))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn remove(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
        match fs::remove_file(self.physical_path(location, path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, location: &StorageLocation, path: &LogicalPath) -> io::Result<bool> {
        Ok(self.physical_path(location, path).exists())
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
