//! Sled 存储实现

mod narration_cache;

pub use narration_cache::{SledCacheConfig, SledNarrationCache};
