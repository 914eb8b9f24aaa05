/// Link and mount-boundary detection for directory entries.
///
/// The scanner never follows symbolic links and never descends into a
/// directory that lives on another device than its parent.
use std::fs::Metadata;

/// Device identifier of the filesystem holding the entry, when the
/// platform exposes one through `std`.
#[cfg(unix)]
pub fn device_id(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.dev())
}

#[cfg(not(unix))]
pub fn device_id(_meta: &Metadata) -> Option<u64> {
    None
}

/// `true` for symbolic links and, on Windows, any reparse point
/// (junctions and volume mount points included).
pub fn is_link_like(meta: &Metadata) -> bool {
    meta.file_type().is_symlink() || is_reparse_point(meta)
}

#[cfg(windows)]
fn is_reparse_point(meta: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    use windows::Win32::Storage::FileSystem::FILE_ATTRIBUTE_REPARSE_POINT;
    meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT.0 != 0
}

#[cfg(not(windows))]
fn is_reparse_point(_meta: &Metadata) -> bool {
    false
}

/// `true` if a directory with metadata `child` sits on a different device
/// than its parent. Unknown devices never count as a crossing.
pub fn crosses_mount(parent_device: Option<u64>, child: &Metadata) -> bool {
    match (parent_device, device_id(child)) {
        (Some(parent), Some(child)) => parent != child,
        _ => false,
    }
}
