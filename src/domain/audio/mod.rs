//! Audio Context - 音频限界上下文
//!
//! 职责:
//! - PCM 缓冲（交错 f32，按帧精确计时）
//! - 增益包络（淡入/保持/淡出，两种混音模式共用同一套计算）
//! - 混音器：单段背景 / 多区域背景交叉淡化
//! - 拼接器：段落间插入固定时长静音
//!
//! 所有时长都以帧为单位计算，秒只用于配置与展示，避免旁白与背景之间的累计漂移。

mod conform;
mod envelope;
mod errors;
mod mixer;
mod pcm;
mod sequencer;
mod track;

pub use conform::conform_to;
pub use envelope::{GainEnvelope, MixSettings, MixingEnvelope};
pub use errors::MixError;
pub use mixer::{adapt_background, BackgroundRegion, MixOutput, Mixer};
pub use pcm::{secs_to_frames, PcmBuffer};
pub use sequencer::{SequencedTrack, Sequencer, UnitSpan};
pub use track::{BackgroundTrack, Resolution};
