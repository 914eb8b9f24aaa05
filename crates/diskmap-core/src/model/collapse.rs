/// Structural simplification of an aggregated record set.
///
/// Two rules, applied in this order:
///
/// 1. **Zero-pruning**: records (other than the root) with `used_size == 0`
///    are removed, and so is every `subfolders` entry that no longer names
///    a record.
/// 2. **Chain-collapsing**: a non-root record with no files and exactly
///    one subfolder is a *pass-through*. Parents skip over it (transitively)
///    to the first descendant with ≥2 subfolders or ≥1 file, and the
///    pass-through records are removed.
///
/// Pruning first means chain detection sees the final child counts, so a
/// second run finds nothing left to do. The root is never removed: the
/// persisted root marker must always resolve.
use super::record_set::RecordSet;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// What a [`RecordSet::collapse`] call removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollapseStats {
    /// Zero-size records deleted.
    pub pruned: usize,
    /// Pass-through records folded into their parents.
    pub collapsed: usize,
}

impl RecordSet {
    /// Prune zero-size records and collapse single-child chains.
    ///
    /// Must run after [`RecordSet::aggregate_sizes`]. Afterwards every
    /// `subfolders` entry names a surviving record.
    pub fn collapse(&mut self) -> CollapseStats {
        debug_assert!(self.aggregated, "collapse requires aggregated sizes");
        let root = self.root().to_path_buf();

        let before = self.records.len();
        self.records
            .retain(|path, record| *path == root || record.used_size > 0);
        let pruned = before - self.records.len();

        // Drop references to pruned (or never recorded) children.
        let fixes: Vec<(PathBuf, Vec<PathBuf>)> = self
            .records
            .iter()
            .filter(|(_, r)| r.subfolders.iter().any(|c| !self.records.contains_key(c)))
            .map(|(path, r)| {
                let live = r
                    .subfolders
                    .iter()
                    .filter(|c| self.records.contains_key(*c))
                    .cloned()
                    .collect();
                (path.clone(), live)
            })
            .collect();
        for (path, live) in fixes {
            if let Some(record) = self.records.get_mut(&path) {
                record.subfolders = live;
            }
        }

        // pass-through -> its sole child
        let pass_through: HashMap<PathBuf, PathBuf> = self
            .records
            .values()
            .filter(|r| r.path != root && r.is_pass_through())
            .map(|r| (r.path.clone(), r.subfolders[0].clone()))
            .collect();

        if !pass_through.is_empty() {
            for record in self.records.values_mut() {
                for child in record.subfolders.iter_mut() {
                    while let Some(next) = pass_through.get(child.as_path()) {
                        *child = next.clone();
                    }
                }
            }
            for path in pass_through.keys() {
                self.records.remove(path);
            }
        }

        let stats = CollapseStats {
            pruned,
            collapsed: pass_through.len(),
        };
        debug!(
            "Collapse removed {} empty and {} pass-through directories; {} remain",
            stats.pruned,
            stats.collapsed,
            self.records.len()
        );
        stats
    }
}
