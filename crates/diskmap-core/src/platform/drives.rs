/// Volume queries: default start directories and used-space estimates.
///
/// The used-space figure only drives the progress bar. It can diverge from
/// what a scan finally sums (sparse files, ignored subtrees, concurrent
/// writes), so callers treat it as an estimate.
use std::io;
use std::path::{Path, PathBuf};

/// Directories a full-machine scan starts from.
///
/// Unix has a single tree rooted at `/`. On Windows every logical drive
/// root is returned (`C:\`, `D:\`, ...).
#[cfg(not(windows))]
pub fn start_directories() -> Vec<PathBuf> {
    vec![PathBuf::from("/")]
}

#[cfg(windows)]
pub fn start_directories() -> Vec<PathBuf> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows::Win32::Storage::FileSystem::GetLogicalDriveStringsW;

    // GetLogicalDriveStringsW returns null-separated drive root strings.
    let mut buffer = [0u16; 256];
    let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) };

    if len == 0 {
        tracing::warn!("GetLogicalDriveStringsW returned 0");
        return Vec::new();
    }

    let full = OsString::from_wide(&buffer[..len as usize]);
    let roots: Vec<PathBuf> = full
        .to_string_lossy()
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    tracing::info!("Found drives: {roots:?}");
    roots
}

/// Used bytes of the volume containing `path` (total minus free).
#[cfg(unix)]
pub fn used_space(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let block_size = stat.f_frsize as u64;
    let used_blocks = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64);
    Ok(used_blocks.saturating_mul(block_size))
}

#[cfg(windows)]
pub fn used_space(path: &Path) -> io::Result<u64> {
    use windows::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

    let wide: Vec<u16> = path
        .to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();
    let pcwstr = windows::core::PCWSTR(wide.as_ptr());

    let mut free_caller: u64 = 0;
    let mut total: u64 = 0;
    let mut free_total: u64 = 0;
    unsafe {
        GetDiskFreeSpaceExW(
            pcwstr,
            Some(&mut free_caller as *mut u64),
            Some(&mut total as *mut u64),
            Some(&mut free_total as *mut u64),
        )
    }
    .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(total.saturating_sub(free_total))
}

#[cfg(not(any(unix, windows)))]
pub fn used_space(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "volume usage is not available on this platform",
    ))
}

/// `true` if `path` is the root of its tree (`/`, `C:\`).
pub fn is_volume_root(path: &Path) -> bool {
    path.parent().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_directories_are_volume_roots() {
        for dir in start_directories() {
            assert!(is_volume_root(&dir), "{} is not a root", dir.display());
        }
    }

    #[test]
    fn used_space_of_temp_dir_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        // Value is environment-dependent; only the call itself must succeed.
        let _used = used_space(tmp.path()).unwrap();
    }

    #[test]
    fn used_space_of_missing_path_fails() {
        assert!(used_space(Path::new("/definitely/not/here")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn nested_dir_is_not_a_volume_root() {
        assert!(is_volume_root(Path::new("/")));
        assert!(!is_volume_root(Path::new("/usr")));
    }
}
