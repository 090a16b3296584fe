//! Storage Adapter - 成品存储实现

mod file_storage;

pub(crate) use file_storage::safe_join;
pub use file_storage::FileArtifactStorage;
