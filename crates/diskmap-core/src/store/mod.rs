/// Persistence for scan results.
///
/// - [`binary`]: type-agnostic, offset-indexed blob file.
/// - [`codec`]: the single binary encoding (plus zstd) everything uses.
/// - [`value`]: the tagged values a scan writes and the reserved keys.
/// - [`project`]: record set → persisted values.
/// - [`scan_store`]: typed read/write surface for one scan.
/// - [`catalog`]: one store per root inside the data directory.
pub mod binary;
pub mod catalog;
pub mod codec;
pub mod project;
pub mod scan_store;
pub mod value;

pub use binary::{BinaryStore, BlobSpan};
pub use catalog::{load_catalog, store_path};
pub use project::{project, Projection};
pub use scan_store::ScanStore;
pub use value::{ChildEntry, NodeValue, StoredValue, DATE_KEY, ROOT_KEY};
