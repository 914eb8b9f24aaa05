/// Values persisted by a scan, and the reserved keys that sit beside the
/// path-keyed nodes.
///
/// Every blob in a scan store is one encoded [`StoredValue`]. The variant
/// tag makes the encoding self-describing, so a reader never has to guess
/// what kind of value a key holds.
use super::codec;
use crate::error::StoreError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Key of the scan root marker. Never a valid normalised path.
pub const ROOT_KEY: &str = "__root__";

/// Key of the scan timestamp.
pub const DATE_KEY: &str = "__date__";

/// Timestamp layout stored under [`DATE_KEY`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `true` for keys that do not name a directory.
pub fn is_reserved_key(key: &str) -> bool {
    key == ROOT_KEY || key == DATE_KEY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredValue {
    /// Normalised starting path of the scan.
    Root(String),
    /// Local time the scan finished, formatted with [`DATE_FORMAT`].
    ScannedAt(String),
    /// One surviving directory.
    Node(NodeValue),
}

impl StoredValue {
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(codec::encode(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(codec::decode(bytes)?)
    }
}

/// A directory as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeValue {
    /// Total bytes below this directory.
    pub used_size: u64,
    /// zstd-compressed encoding of `Vec<ChildEntry>`, largest first.
    pub children: Vec<u8>,
}

impl NodeValue {
    /// Encode and compress a children list.
    pub fn pack(used_size: u64, children: &[ChildEntry], level: i32) -> Result<Self, StoreError> {
        let raw = codec::encode(children)?;
        let children = codec::compress(&raw, level)?;
        Ok(Self {
            used_size,
            children,
        })
    }

    /// Decompress and decode the children list.
    pub fn unpack_children(&self) -> Result<Vec<ChildEntry>, StoreError> {
        let raw = codec::decompress(&self.children)?;
        Ok(codec::decode(&raw)?)
    }
}

/// One direct child of a directory: a subfolder or a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    /// Name relative to the parent. Collapsed chains give `a/b/c`.
    pub name: CompactString,
    /// Full normalised path; for folders this is also the store key.
    pub path: String,
    /// Bytes (total size for folders).
    pub size: u64,
    pub is_file: bool,
}
