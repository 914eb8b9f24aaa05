/// Bottom-up size aggregation over a finished record set.
///
/// Workers complete in arbitrary order, so the set carries no parent-first
/// layout to exploit. Instead records are processed deepest first: every
/// child sits exactly one level below its parent, so by the time a parent
/// is summed all of its children already hold their final totals.
use super::record_set::RecordSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

impl RecordSet {
    /// Compute `used_size` for every record.
    ///
    /// `used_size = direct file bytes + Σ used_size(child)`, where children
    /// missing from the set (unreadable, vanished) contribute zero. The
    /// volatile `files_size` accumulator is cleared afterwards.
    ///
    /// Sizes are re-derived from the file maps, so running this twice gives
    /// the same result.
    pub fn aggregate_sizes(&mut self) {
        let start = Instant::now();

        // Deepest first; ties by path so the pass order is deterministic.
        let mut order: Vec<(u32, PathBuf)> = self
            .records
            .values()
            .map(|r| (r.depth, r.path.clone()))
            .collect();
        order.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, path) in &order {
            let Some(record) = self.records.get(path) else {
                continue;
            };
            let children: u64 = record
                .subfolders
                .iter()
                .filter_map(|child| self.records.get(child))
                .map(|child| child.used_size)
                .sum();
            let total = record.direct_file_bytes() + children;

            if let Some(record) = self.records.get_mut(path) {
                record.used_size = total;
                record.files_size = 0;
            }
        }

        self.aggregated = true;
        debug!(
            "Aggregated {} directories in {:?}",
            order.len(),
            start.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{RecordSet, ScanRecord};
    use compact_str::CompactString;
    use std::path::{Path, PathBuf};

    fn dir(path: &str, depth: u32, files: &[(&str, u64)], subs: &[&str]) -> ScanRecord {
        let mut record = ScanRecord::empty(PathBuf::from(path), depth);
        for (name, size) in files {
            record.add_file(CompactString::new(name), *size);
        }
        for sub in subs {
            record.add_subfolder(PathBuf::from(sub));
        }
        record
    }

    #[test]
    fn sums_descendants_bottom_up() {
        // /r -> a (100) -> b (50), /r -> c (empty)
        let mut set = RecordSet::new(PathBuf::from("/r"));
        set.insert(dir("/r", 0, &[], &["/r/a", "/r/c"]));
        set.insert(dir("/r/a", 1, &[("file1", 100)], &["/r/a/b"]));
        set.insert(dir("/r/a/b", 2, &[("file2", 50)], &[]));
        set.insert(dir("/r/c", 1, &[], &[]));

        set.aggregate_sizes();

        assert_eq!(set.used_size(Path::new("/r")), Some(150));
        assert_eq!(set.used_size(Path::new("/r/a")), Some(150));
        assert_eq!(set.used_size(Path::new("/r/a/b")), Some(50));
        assert_eq!(set.used_size(Path::new("/r/c")), Some(0));
        assert!(set.is_consistent());
        assert!(set.iter().all(|r| r.files_size == 0));
    }

    #[test]
    fn long_shallow_name_does_not_break_ordering() {
        // A depth-1 directory whose path is longer than a depth-3 one.
        let long = "/r/a_directory_with_a_very_long_name_indeed";
        let mut set = RecordSet::new(PathBuf::from("/r"));
        set.insert(dir("/r", 0, &[], &[long, "/r/x"]));
        set.insert(dir(long, 1, &[("f", 1)], &[]));
        set.insert(dir("/r/x", 1, &[], &["/r/x/y"]));
        set.insert(dir("/r/x/y", 2, &[], &["/r/x/y/z"]));
        set.insert(dir("/r/x/y/z", 3, &[("g", 9)], &[]));

        set.aggregate_sizes();

        assert_eq!(set.used_size(Path::new("/r")), Some(10));
        assert_eq!(set.used_size(Path::new("/r/x")), Some(9));
        assert!(set.is_consistent());
    }

    #[test]
    fn missing_children_count_as_zero() {
        let mut set = RecordSet::new(PathBuf::from("/r"));
        set.insert(dir("/r", 0, &[("f", 3)], &["/r/gone"]));

        set.aggregate_sizes();

        assert_eq!(set.used_size(Path::new("/r")), Some(3));
    }

    #[test]
    fn aggregation_is_repeatable() {
        let mut set = RecordSet::new(PathBuf::from("/r"));
        set.insert(dir("/r", 0, &[("f", 3)], &["/r/a"]));
        set.insert(dir("/r/a", 1, &[("g", 4)], &[]));

        set.aggregate_sizes();
        set.aggregate_sizes();

        assert_eq!(set.used_size(Path::new("/r")), Some(7));
        assert!(set.is_aggregated());
    }
}
