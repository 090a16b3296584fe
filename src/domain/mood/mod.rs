//! Mood Context - 情绪限界上下文
//!
//! 职责:
//! - 情绪元数据值对象（强度始终限制在 [1,10]）
//! - 情绪字符串 → 背景音乐分类映射
//! - 可注入的随机源（用于 drama 关键字）

mod category;
mod random;
mod value_objects;

pub use category::{map_mood_to_category, match_rule, CategoryRule, MusicCategory, KEYWORD_GROUPS};
pub use random::{FixedRandomSource, RandomSource, StdRandomSource};
pub use value_objects::{Intensity, MoodMetadata, Tempo, MAX_ASSET_INDEX};
