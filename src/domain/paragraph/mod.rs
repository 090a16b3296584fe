//! Paragraph Context - 段落限界上下文
//!
//! 职责:
//! - 原始文本 → 有序段落文本（分隔符优先，空行兜底）
//! - 段落单元实体，随流水线各阶段逐步填充

mod entities;
mod errors;
mod segmenter;

pub use entities::ParagraphUnit;
pub use errors::SegmentError;
pub use segmenter::{
    segment_text, SegmentConfig, Segmentation, SplitStrategy, DEFAULT_DELIMITER,
    DEFAULT_FALLBACK_MIN_CHARS, DEFAULT_MAX_UNITS,
};
