/// The flat, unordered collection of scan records for one scan root.
///
/// Workers insert into it concurrently (behind the scanner's data lock);
/// aggregation, collapsing and projection then run over it single-threaded.
/// The scan root is held in its own field rather than as a keyed record
/// marker, so it can never show up in a `subfolders` list.
use super::record::ScanRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RecordSet {
    root: PathBuf,
    pub(crate) records: HashMap<PathBuf, ScanRecord>,
    pub(crate) aggregated: bool,
}

impl RecordSet {
    /// An empty set for the given normalised root.
    pub fn new(root: PathBuf) -> Self {
        Self::with_capacity(root, 0)
    }

    /// Pre-allocate for roughly `estimated_dirs` directories.
    pub fn with_capacity(root: PathBuf, estimated_dirs: usize) -> Self {
        Self {
            root,
            records: HashMap::with_capacity(estimated_dirs),
            aggregated: false,
        }
    }

    /// The normalised starting path of the scan.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_record(&self) -> Option<&ScanRecord> {
        self.records.get(&self.root)
    }

    /// Insert a finished record. Each directory is visited once, so a
    /// duplicate is a scanner bug: the first record is kept and `false`
    /// is returned.
    pub fn insert(&mut self, record: ScanRecord) -> bool {
        if self.records.contains_key(&record.path) {
            tracing::warn!("duplicate scan record for {}", record.path.display());
            return false;
        }
        self.records.insert(record.path.clone(), record);
        true
    }

    #[inline]
    pub fn get(&self, path: &Path) -> Option<&ScanRecord> {
        self.records.get(path)
    }

    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Total size of a directory, once aggregated.
    pub fn used_size(&self, path: &Path) -> Option<u64> {
        self.records.get(path).map(|r| r.used_size)
    }

    /// All records, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ScanRecord> {
        self.records.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `true` once [`RecordSet::aggregate_sizes`] has run.
    pub fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    /// Check the aggregation invariant on every record:
    /// `used_size == direct file bytes + Σ used_size(child)`.
    ///
    /// Children absent from the set count as zero.
    pub fn is_consistent(&self) -> bool {
        self.records.values().all(|record| {
            let children: u64 = record
                .subfolders
                .iter()
                .filter_map(|child| self.records.get(child))
                .map(|child| child.used_size)
                .sum();
            record.used_size == record.direct_file_bytes() + children
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_str::CompactString;

    #[test]
    fn duplicate_insert_keeps_first_record() {
        let mut set = RecordSet::new(PathBuf::from("/r"));
        let mut first = ScanRecord::empty(PathBuf::from("/r"), 0);
        first.add_file(CompactString::new("a"), 7);
        assert!(set.insert(first));
        assert!(!set.insert(ScanRecord::empty(PathBuf::from("/r"), 0)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.used_size(Path::new("/r")), Some(7));
    }

    #[test]
    fn root_record_lookup() {
        let mut set = RecordSet::new(PathBuf::from("/r"));
        assert!(set.root_record().is_none());
        set.insert(ScanRecord::empty(PathBuf::from("/r"), 0));
        assert_eq!(set.root(), Path::new("/r"));
        assert!(set.root_record().is_some());
        assert!(!set.is_aggregated());
    }
}
