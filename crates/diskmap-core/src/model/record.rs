/// A single visited directory.
///
/// Created exactly once by the worker that lists the directory, then
/// mutated in place by aggregation and collapsing. The `path` never
/// changes; collapsing may delete a record but never renames one.
use compact_str::CompactString;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Normalised absolute path. Unique key within a record set.
    pub path: PathBuf,

    /// Directory hops from the scan root (root = 0).
    pub depth: u32,

    /// Sum of direct file sizes. Only meaningful until aggregation, which
    /// clears it.
    pub files_size: u64,

    /// Total size including all descendants. Equals `files_size` until
    /// aggregation runs.
    pub used_size: u64,

    /// Visited child directories, in discovery order.
    pub subfolders: Vec<PathBuf>,

    /// Direct files as `(name, size)`, in discovery order.
    pub files: Vec<(CompactString, u64)>,
}

impl ScanRecord {
    /// A record with no children, used both as the starting accumulator
    /// and for directories that could not be listed.
    pub fn empty(path: PathBuf, depth: u32) -> Self {
        Self {
            path,
            depth,
            files_size: 0,
            used_size: 0,
            subfolders: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Record a direct file.
    pub fn add_file(&mut self, name: CompactString, size: u64) {
        self.files_size += size;
        self.used_size = self.files_size;
        self.files.push((name, size));
    }

    /// Record a visited child directory.
    pub fn add_subfolder(&mut self, path: PathBuf) {
        self.subfolders.push(path);
    }

    /// Sum of the direct file map, independent of `files_size`.
    pub fn direct_file_bytes(&self) -> u64 {
        self.files.iter().map(|(_, size)| size).sum()
    }

    /// No files and exactly one subfolder.
    pub fn is_pass_through(&self) -> bool {
        self.files.is_empty() && self.subfolders.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_keeps_sizes_in_step() {
        let mut record = ScanRecord::empty(PathBuf::from("/r"), 0);
        record.add_file(CompactString::new("a"), 10);
        record.add_file(CompactString::new("b"), 5);
        assert_eq!(record.files_size, 15);
        assert_eq!(record.used_size, 15);
        assert_eq!(record.direct_file_bytes(), 15);
        assert_eq!(record.files[0].0, "a");
    }

    #[test]
    fn pass_through_requires_one_folder_and_no_files() {
        let mut record = ScanRecord::empty(PathBuf::from("/r"), 0);
        assert!(!record.is_pass_through());
        record.add_subfolder(PathBuf::from("/r/x"));
        assert!(record.is_pass_through());
        record.add_file(CompactString::new("f"), 1);
        assert!(!record.is_pass_through());
    }
}
