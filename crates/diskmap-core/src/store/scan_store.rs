/// Typed query surface over a [`BinaryStore`] holding one scan.
///
/// This is what a presentation layer opens: it answers "what was the scan
/// root", "when was it scanned", and "what are the children of this path"
/// without deserializing anything it is not asked for.
use super::binary::BinaryStore;
use super::project::Projection;
use super::value::{
    is_reserved_key, ChildEntry, NodeValue, StoredValue, DATE_FORMAT, DATE_KEY, ROOT_KEY,
};
use crate::error::StoreError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub struct ScanStore {
    inner: BinaryStore,
}

impl ScanStore {
    /// A closed handle for the store file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: BinaryStore::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn open(&mut self) -> Result<(), StoreError> {
        self.inner.open()
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Persist a projection in one shot and reopen the store on the new file.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, projection: Projection) -> Result<u64, StoreError> {
        let written = self.inner.create(projection.into_entries()?)?;
        self.inner.open()?;
        Ok(written)
    }

    fn value(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        match self.inner.get(key)? {
            Some(bytes) => Ok(Some(StoredValue::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn unexpected(&self, key: &str) -> StoreError {
        StoreError::corrupt(self.path(), format!("unexpected value kind under '{key}'"))
    }

    /// The normalised scan root, if the store has one.
    pub fn root(&self) -> Result<Option<String>, StoreError> {
        match self.value(ROOT_KEY)? {
            Some(StoredValue::Root(root)) => Ok(Some(root)),
            Some(_) => Err(self.unexpected(ROOT_KEY)),
            None => Ok(None),
        }
    }

    /// When the stored scan finished (local time).
    pub fn scanned_at(&self) -> Result<Option<NaiveDateTime>, StoreError> {
        match self.value(DATE_KEY)? {
            Some(StoredValue::ScannedAt(text)) => {
                NaiveDateTime::parse_from_str(&text, DATE_FORMAT)
                    .map(Some)
                    .map_err(|e| {
                        StoreError::corrupt(self.path(), format!("bad scan date '{text}': {e}"))
                    })
            }
            Some(_) => Err(self.unexpected(DATE_KEY)),
            None => Ok(None),
        }
    }

    /// The node stored for a directory path. Reserved keys are never nodes.
    pub fn node(&self, path: &str) -> Result<Option<NodeValue>, StoreError> {
        if is_reserved_key(path) {
            return Ok(None);
        }
        match self.value(path)? {
            Some(StoredValue::Node(node)) => Ok(Some(node)),
            Some(_) => Err(self.unexpected(path)),
            None => Ok(None),
        }
    }

    /// Children of a directory, largest first.
    pub fn children(&self, path: &str) -> Result<Option<Vec<ChildEntry>>, StoreError> {
        match self.node(path)? {
            Some(node) => Ok(Some(node.unpack_children()?)),
            None => Ok(None),
        }
    }

    /// Total size of a directory.
    pub fn used_size(&self, path: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.node(path)?.map(|node| node.used_size))
    }

    /// `true` if `path` was scanned and survived collapsing. No I/O.
    pub fn contains(&self, path: &str) -> bool {
        !is_reserved_key(path) && self.inner.contains(path)
    }

    /// Directory keys, reserved keys excluded.
    pub fn node_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.keys().filter(|key| !is_reserved_key(key))
    }

    pub fn node_count(&self) -> usize {
        self.node_keys().count()
    }

    /// `true` when the store is closed or holds no directories.
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}
