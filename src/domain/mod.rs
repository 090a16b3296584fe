//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Paragraph Context: 段落切分与段落单元
//! - Mood Context: 情绪元数据与音乐分类映射
//! - Audio Context: PCM 缓冲、混音包络、混音器与拼接器
//!
//! 领域层不做任何 IO，全部为同步纯逻辑

pub mod audio;
pub mod mood;
pub mod paragraph;

pub use audio::{
    adapt_background, conform_to, secs_to_frames, BackgroundRegion, BackgroundTrack,
    GainEnvelope, MixError, MixOutput, MixSettings, Mixer, MixingEnvelope, PcmBuffer, Resolution,
    SequencedTrack, Sequencer, UnitSpan,
};
pub use mood::{
    map_mood_to_category, FixedRandomSource, Intensity, MoodMetadata, MusicCategory,
    RandomSource, StdRandomSource, Tempo,
};
pub use paragraph::{
    segment_text, ParagraphUnit, SegmentConfig, SegmentError, Segmentation, SplitStrategy,
};
