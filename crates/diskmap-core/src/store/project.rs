/// Projection: turn an aggregated, collapsed record set into the values a
/// scan store persists.
use super::value::{ChildEntry, NodeValue, StoredValue, DATE_FORMAT, DATE_KEY, ROOT_KEY};
use crate::error::StoreError;
use crate::model::{RecordSet, ScanRecord};
use crate::platform::{path_key, relative_name};
use chrono::{DateTime, Local};
use compact_str::CompactString;

/// Everything one scan writes, ready for a single bulk create.
#[derive(Debug, Clone)]
pub struct Projection {
    pub root: String,
    pub scanned_at: String,
    /// `(path key, node)`, sorted by key so identical scans produce
    /// identical files.
    pub nodes: Vec<(String, NodeValue)>,
}

impl Projection {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Encode into `(key, blob)` pairs for [`super::BinaryStore::create`].
    pub fn into_entries(self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut entries = Vec::with_capacity(self.nodes.len() + 2);
        entries.push((ROOT_KEY.to_string(), StoredValue::Root(self.root).encode()?));
        entries.push((
            DATE_KEY.to_string(),
            StoredValue::ScannedAt(self.scanned_at).encode()?,
        ));
        for (key, node) in self.nodes {
            entries.push((key, StoredValue::Node(node).encode()?));
        }
        Ok(entries)
    }
}

/// Build the persisted shape of `set`.
///
/// Each record becomes a node whose children are its subfolders followed
/// by its files, stable-sorted by size descending so equal sizes keep
/// discovery order.
pub fn project(
    set: &RecordSet,
    scanned_at: DateTime<Local>,
    compression_level: i32,
) -> Result<Projection, StoreError> {
    debug_assert!(set.is_aggregated(), "projection requires aggregated sizes");

    let mut nodes = Vec::with_capacity(set.len());
    for record in set.iter() {
        let children = children_of(set, record);
        nodes.push((
            path_key(&record.path),
            NodeValue::pack(record.used_size, &children, compression_level)?,
        ));
    }
    nodes.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    Ok(Projection {
        root: path_key(set.root()),
        scanned_at: scanned_at.format(DATE_FORMAT).to_string(),
        nodes,
    })
}

/// Sorted children list of one record.
pub fn children_of(set: &RecordSet, record: &ScanRecord) -> Vec<ChildEntry> {
    let folders = record.subfolders.iter().filter_map(|sub| {
        set.get(sub).map(|child| ChildEntry {
            name: CompactString::new(relative_name(&record.path, sub)),
            path: path_key(sub),
            size: child.used_size,
            is_file: false,
        })
    });
    let files = record.files.iter().map(|(name, size)| ChildEntry {
        name: name.clone(),
        path: path_key(&record.path.join(name.as_str())),
        size: *size,
        is_file: true,
    });

    let mut children: Vec<ChildEntry> = folders.chain(files).collect();
    children.sort_by(|a, b| b.size.cmp(&a.size));
    children
}
