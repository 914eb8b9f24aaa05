/// Append-only, offset-indexed blob store.
///
/// File layout:
///
/// ```text
/// [blob 0][blob 1]...[blob N][encoded index][u64 LE: offset of index]
/// ```
///
/// Blobs are written back to back with no padding or delimiter. The index
/// maps each key to the `(offset, length)` of its blob and is loadable on
/// its own: seek to `len - 8`, read the pointer, seek to it, read up to the
/// pointer. Lookups after that are one seek and one read.
///
/// The store is type-agnostic: values are opaque byte buffers and callers
/// own their (de)serialization.
use super::codec;
use crate::error::StoreError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Width of the trailing index pointer.
pub const INDEX_POINTER_LEN: u64 = 8;

/// Location of one value inside the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobSpan {
    pub offset: u64,
    pub length: u64,
}

impl BlobSpan {
    /// One past the last byte, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// Handle to one store file. Starts closed; see [`BinaryStore::open`].
pub struct BinaryStore {
    path: PathBuf,
    open: Option<OpenStore>,
}

/// State that only exists while the file is open.
struct OpenStore {
    /// Reads seek, so they are serialised; an open store is `Sync`.
    file: Mutex<File>,
    index: HashMap<String, BlobSpan>,
}

impl BinaryStore {
    /// A closed handle for `path`. No I/O happens until `open` or `create`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            open: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Write a complete store, replacing any existing file.
    ///
    /// The data goes to a sibling temporary file that is synced and then
    /// renamed over the target, so on failure the previous store is left
    /// exactly as it was. An open handle is closed first and stays closed.
    /// If a key repeats, the last value wins.
    ///
    /// Returns the size of the written file.
    pub fn create<I, K>(&mut self, entries: I) -> Result<u64, StoreError>
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        self.close();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = temp_path(&self.path);
        let written = write_store(&tmp_path, entries).and_then(|len| {
            fs::rename(&tmp_path, &self.path)?;
            Ok(len)
        });
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }

        let len = written?;
        debug!("Wrote store {} ({len} bytes)", self.path.display());
        Ok(len)
    }

    /// Load the index and keep the file open for lazy reads.
    ///
    /// Opening an open store does nothing. A missing file is
    /// [`StoreError::Missing`]; a bad pointer or undecodable index is
    /// [`StoreError::Corrupt`]. Both mean "no usable data".
    pub fn open(&mut self) -> Result<(), StoreError> {
        if self.open.is_some() {
            return Ok(());
        }

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let index = read_index(&self.path, &mut file)?;
        debug!(
            "Opened store {} with {} keys",
            self.path.display(),
            index.len()
        );
        self.open = Some(OpenStore {
            file: Mutex::new(file),
            index,
        });
        Ok(())
    }

    /// Release the file handle. Closing a closed store does nothing.
    pub fn close(&mut self) {
        self.open = None;
    }

    /// Read the value stored under `key`.
    ///
    /// An absent key is `Ok(None)`, not an error, so this doubles as an
    /// existence check that also fetches the value.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let store = self.open.as_ref().ok_or(StoreError::Closed)?;
        let Some(span) = store.index.get(key).copied() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; span.length as usize];
        let mut file = store.file.lock();
        file.seek(SeekFrom::Start(span.offset))?;
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    /// Index-only lookup; `false` on a closed store.
    pub fn contains(&self, key: &str) -> bool {
        self.open
            .as_ref()
            .is_some_and(|store| store.index.contains_key(key))
    }

    /// Where the value for `key` lives, if present.
    pub fn span(&self, key: &str) -> Option<BlobSpan> {
        self.open
            .as_ref()
            .and_then(|store| store.index.get(key).copied())
    }

    /// All keys, in no particular order. Empty on a closed store.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.open
            .iter()
            .flat_map(|store| store.index.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.open.as_ref().map_or(0, |store| store.index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_store<I, K>(path: &Path, entries: I) -> Result<u64, StoreError>
where
    I: IntoIterator<Item = (K, Vec<u8>)>,
    K: Into<String>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut index: HashMap<String, BlobSpan> = HashMap::new();
    let mut offset: u64 = 0;

    for (key, value) in entries {
        writer.write_all(&value)?;
        let length = value.len() as u64;
        index.insert(key.into(), BlobSpan { offset, length });
        offset += length;
    }

    let index_bytes = codec::encode(&index)?;
    writer.write_all(&index_bytes)?;
    writer.write_all(&offset.to_le_bytes())?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(offset + index_bytes.len() as u64 + INDEX_POINTER_LEN)
}

fn read_index(path: &Path, file: &mut File) -> Result<HashMap<String, BlobSpan>, StoreError> {
    let file_len = file.metadata()?.len();
    if file_len < INDEX_POINTER_LEN {
        return Err(StoreError::corrupt(
            path,
            format!("file is {file_len} bytes, too short for an index pointer"),
        ));
    }

    let pointer_pos = file_len - INDEX_POINTER_LEN;
    file.seek(SeekFrom::Start(pointer_pos))?;
    let mut pointer = [0u8; INDEX_POINTER_LEN as usize];
    file.read_exact(&mut pointer)?;
    let index_offset = u64::from_le_bytes(pointer);

    if index_offset > pointer_pos {
        return Err(StoreError::corrupt(
            path,
            format!(
                "index offset {index_offset} is past the end of the index region ({pointer_pos})"
            ),
        ));
    }

    file.seek(SeekFrom::Start(index_offset))?;
    let mut raw = Vec::with_capacity((pointer_pos - index_offset) as usize);
    Read::by_ref(file)
        .take(pointer_pos - index_offset)
        .read_to_end(&mut raw)?;

    let index: HashMap<String, BlobSpan> = codec::decode(&raw)
        .map_err(|e| StoreError::corrupt(path, format!("index does not decode: {e}")))?;

    if let Some((key, _)) = index
        .iter()
        .find(|(_, span)| span.end().map_or(true, |end| end > index_offset))
    {
        return Err(StoreError::corrupt(
            path,
            format!("entry '{key}' reaches past the data region"),
        ));
    }

    Ok(index)
}
