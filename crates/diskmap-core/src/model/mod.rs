/// Data model for a scan: one record per visited directory, collected in
/// a flat record set and post-processed in place.
pub mod aggregate;
pub mod collapse;
pub mod record;
pub mod record_set;
pub mod size;

pub use collapse::CollapseStats;
pub use record::ScanRecord;
pub use record_set::RecordSet;
