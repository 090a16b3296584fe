//! 拼接器
//!
//! 按原文顺序拼接段落缓冲，相邻两段之间插入且仅插入一段固定时长静音：
//! 首段之前、末段之后都不插入，单段任务没有静音。
//! 输出帧数 = Σ(段落帧数) + (n − 1) × gap 帧数。

use super::errors::MixError;
use super::pcm::{secs_to_frames, PcmBuffer};

/// 单个段落在最终音轨中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpan {
    pub start_frame: usize,
    pub frames: usize,
}

impl UnitSpan {
    pub fn end_frame(&self) -> usize {
        self.start_frame + self.frames
    }
}

/// 拼接结果
#[derive(Debug, Clone)]
pub struct SequencedTrack {
    pub buffer: PcmBuffer,
    /// 每个段落的位置，与输入顺序一致
    pub spans: Vec<UnitSpan>,
    /// 单段静音的帧数
    pub gap_frames: usize,
}

/// 拼接器
#[derive(Debug, Clone, Copy)]
pub struct Sequencer {
    gap_secs: f64,
}

impl Sequencer {
    pub fn new(gap_secs: f64) -> Self {
        Self {
            gap_secs: gap_secs.max(0.0),
        }
    }

    pub fn gap_secs(&self) -> f64 {
        self.gap_secs
    }

    /// 拼接段落缓冲
    ///
    /// 所有段落必须与首段格式一致，否则返回 `FormatMismatch`
    pub fn concat(&self, units: Vec<PcmBuffer>) -> Result<SequencedTrack, MixError> {
        let mut iter = units.into_iter();
        let first = iter.next().ok_or(MixError::EmptySequence)?;

        let gap_frames = secs_to_frames(self.gap_secs, first.sample_rate());
        let mut spans = vec![UnitSpan {
            start_frame: 0,
            frames: first.frames(),
        }];
        let mut buffer = first;

        for unit in iter {
            buffer.ensure_same_format(&unit)?;
            buffer.append_silence(gap_frames);
            let start_frame = buffer.frames();
            buffer.append(&unit)?;
            spans.push(UnitSpan {
                start_frame,
                frames: unit.frames(),
            });
        }

        Ok(SequencedTrack {
            buffer,
            spans,
            gap_frames,
        })
    }
}
