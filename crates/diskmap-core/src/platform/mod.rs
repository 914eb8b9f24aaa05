/// Platform-specific functionality: path normalisation, volume usage,
/// start directories, and mount/link detection.

pub mod drives;
pub mod mounts;
pub mod path;

pub use drives::{start_directories, used_space};
pub use path::{normalize, path_key, relative_name};
