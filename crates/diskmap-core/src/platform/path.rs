/// Path normalisation.
///
/// Every key in a record set and in a persisted store goes through
/// [`normalize`], so two spellings of the same directory (`/a/./b/`,
/// `/a//b`, `/a/c/../b`) always map to the same key.
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and lexically normal.
///
/// Relative paths are joined onto the current directory. `.` components
/// and repeated or trailing separators are dropped, `..` removes the
/// previous component without touching the filesystem, and a root stays
/// a root (`/..` is `/`). Symbolic links are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// String form of a normalised path, as used for store keys.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Display name of `child` relative to `parent`.
///
/// A collapsed chain yields several segments (`b/c/d`). Falls back to the
/// last component when `child` is not below `parent`.
pub fn relative_name(parent: &Path, child: &Path) -> String {
    match child.strip_prefix(parent) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => child
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_key(child)),
    }
}
