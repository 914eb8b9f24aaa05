/// The data directory: one store file per scanned root.
///
/// Stores that cannot be read back (truncated, corrupt index, no root
/// marker) are deleted when the catalog is loaded; their root simply
/// counts as never scanned.
use super::scan_store::ScanStore;
use crate::error::StoreError;
use crate::platform::path_key;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const STORE_PREFIX: &str = "usage_of_";
pub const STORE_EXTENSION: &str = "db";

/// Hex digits of the root-key hash appended to each store name.
const ROOT_HASH_LEN: usize = 8;

/// File-name-safe form of a root path: drive colons removed, separators
/// turned into `_`, and leading/trailing `_` trimmed (`C:\` → `C`,
/// `/home/me` → `home_me`).
pub fn sanitize_root(root: &str) -> String {
    root.replace(':', "")
        .replace(['/', '\\'], "_")
        .trim_matches('_')
        .to_string()
}

/// Store file used for scans of `root`: `usage_of_<sanitized>_<hash>.db`.
///
/// Sanitizing is lossy (`/a_b` and `/a/b` both become `a_b`), so the name
/// carries a short blake3 digest of the full root key to keep roots apart.
pub fn store_path(data_dir: &Path, root: &Path) -> PathBuf {
    let key = path_key(root);
    let digest = blake3::hash(key.as_bytes()).to_hex();
    data_dir.join(format!(
        "{STORE_PREFIX}{}_{}.{STORE_EXTENSION}",
        sanitize_root(&key),
        &digest[..ROOT_HASH_LEN]
    ))
}

/// Map every readable store in `data_dir` from its scan root to its path.
///
/// Creates `data_dir` if needed. Unusable stores are removed; stores that
/// merely fail with an I/O error (permissions) are skipped and kept.
pub fn load_catalog(data_dir: &Path) -> Result<BTreeMap<String, PathBuf>, StoreError> {
    fs::create_dir_all(data_dir)?;

    let mut catalog = BTreeMap::new();
    for entry in fs::read_dir(data_dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("Cannot read entry in {}: {e}", data_dir.display());
                continue;
            }
        };
        if path.extension().and_then(|ext| ext.to_str()) != Some(STORE_EXTENSION) {
            continue;
        }

        let mut store = ScanStore::new(&path);
        let root = store.open().and_then(|()| store.root());
        store.close();

        match root {
            Ok(Some(root)) => {
                catalog.insert(root, path);
            }
            Ok(None) => discard(&path, "no root marker"),
            Err(e) if e.is_no_data() || matches!(e, StoreError::Codec(_)) => {
                discard(&path, &e.to_string())
            }
            Err(e) => warn!("Skipping store {}: {e}", path.display()),
        }
    }

    info!("Loaded {} stored scans from {}", catalog.len(), data_dir.display());
    Ok(catalog)
}

fn discard(path: &Path, reason: &str) {
    warn!("Discarding unusable store {}: {reason}", path.display());
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not delete {}: {e}", path.display());
    }
}
