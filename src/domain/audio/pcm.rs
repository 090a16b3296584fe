//! PCM 缓冲

use super::errors::MixError;

/// 秒 → 帧数（四舍五入）
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    if secs <= 0.0 || sample_rate == 0 {
        return 0;
    }
    (secs * sample_rate as f64).round() as usize
}

/// 交错排列的 f32 PCM 缓冲
///
/// 不变量:
/// - sample_rate > 0, channels > 0
/// - samples.len() 是 channels 的整数倍
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, MixError> {
        if sample_rate == 0 {
            return Err(MixError::InvalidBuffer("sample rate is 0".to_string()));
        }
        if channels == 0 {
            return Err(MixError::InvalidBuffer("channel count is 0".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(MixError::InvalidBuffer(format!(
                "{} samples is not a multiple of {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// 指定帧数的静音
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: vec![0.0; frames * channels.max(1) as usize],
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }

    /// 格式描述，例如 `22050Hz/1ch`
    pub fn format_label(&self) -> String {
        format!("{}Hz/{}ch", self.sample_rate, self.channels)
    }

    pub fn same_format(&self, other: &PcmBuffer) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    pub fn ensure_same_format(&self, other: &PcmBuffer) -> Result<(), MixError> {
        if self.same_format(other) {
            Ok(())
        } else {
            Err(MixError::FormatMismatch {
                expected: self.format_label(),
                actual: other.format_label(),
            })
        }
    }

    /// 追加另一段同格式音频
    pub fn append(&mut self, other: &PcmBuffer) -> Result<(), MixError> {
        self.ensure_same_format(other)?;
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// 追加指定帧数的静音
    pub fn append_silence(&mut self, frames: usize) {
        let new_len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(new_len, 0.0);
    }

    /// 对所有样本施加恒定增益
    pub fn apply_gain(&mut self, gain: f32) {
        for s in self.samples.iter_mut() {
            *s *= gain;
        }
    }
}
