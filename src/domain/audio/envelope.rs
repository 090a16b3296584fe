//! 增益包络
//!
//! 背景音乐的增益曲线：0 → target（淡入）、保持、target → 0（淡出，最后一帧恰为 0）。
//! 单段混音与多区域混音都只通过 `GainEnvelope` 计算增益。

use serde::{Deserialize, Serialize};

use super::pcm::secs_to_frames;

/// 混音参数
///
/// 客户端即时渲染与服务端批量渲染曾经各自硬编码一套常量，这里统一为一组命名参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixSettings {
    /// 旁白恒定增益（略低于满幅，保证背景可被听到）
    pub narration_gain: f32,
    /// 背景目标增益
    pub background_gain: f32,
    /// 背景最低可闻增益，目标增益不会低于该值
    pub background_floor: f32,
    /// 背景淡入时长（秒）
    pub fade_in_secs: f64,
    /// 背景淡出时长（秒），淡出恰好结束于旁白末尾
    pub fade_out_secs: f64,
    /// 多区域模式下相邻区域的交叉淡化时长（秒）
    pub crossfade_secs: f64,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            narration_gain: 0.9,
            background_gain: 0.25,
            background_floor: 0.08,
            fade_in_secs: 1.5,
            fade_out_secs: 2.0,
            crossfade_secs: 1.0,
        }
    }
}

impl MixSettings {
    /// 实际使用的背景目标增益（应用最低可闻下限）
    pub fn effective_background_gain(&self) -> f32 {
        self.background_gain.max(self.background_floor)
    }
}

/// 淡入/保持/淡出增益曲线，以帧为单位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    target: f32,
    total_frames: usize,
    fade_in_frames: usize,
    fade_out_frames: usize,
}

impl GainEnvelope {
    /// 创建包络
    ///
    /// 淡入与淡出之和超过总长度时按比例缩短，保证两段斜坡不越界
    pub fn new(target: f32, total_frames: usize, fade_in_frames: usize, fade_out_frames: usize) -> Self {
        let (fade_in_frames, fade_out_frames) = if fade_in_frames + fade_out_frames > total_frames {
            let sum = (fade_in_frames + fade_out_frames) as f64;
            let fade_in = (total_frames as f64 * fade_in_frames as f64 / sum).floor() as usize;
            (fade_in, total_frames - fade_in)
        } else {
            (fade_in_frames, fade_out_frames)
        };

        Self {
            target,
            total_frames,
            fade_in_frames,
            fade_out_frames,
        }
    }

    /// 以秒为单位创建包络
    pub fn from_secs(
        target: f32,
        total_frames: usize,
        fade_in_secs: f64,
        fade_out_secs: f64,
        sample_rate: u32,
    ) -> Self {
        Self::new(
            target,
            total_frames,
            secs_to_frames(fade_in_secs, sample_rate),
            secs_to_frames(fade_out_secs, sample_rate),
        )
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn fade_in_frames(&self) -> usize {
        self.fade_in_frames
    }

    pub fn fade_out_frames(&self) -> usize {
        self.fade_out_frames
    }

    /// 第 `frame` 帧的增益，区间外为 0
    #[inline]
    pub fn gain_at(&self, frame: usize) -> f32 {
        if frame >= self.total_frames {
            return 0.0;
        }

        let ramp_in = if self.fade_in_frames == 0 {
            1.0
        } else {
            (frame as f32 / self.fade_in_frames as f32).min(1.0)
        };

        let remaining = self.total_frames - 1 - frame;
        let ramp_out = if self.fade_out_frames == 0 {
            1.0
        } else {
            (remaining as f32 / self.fade_out_frames as f32).min(1.0)
        };

        self.target * ramp_in.min(ramp_out)
    }
}

/// 一次混音实际使用的包络参数（用于日志与结果上报）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixingEnvelope {
    pub narration_gain: f32,
    pub background_gain: f32,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// 背景被完整播放的次数（含首次），裁剪时为 1
    pub loop_count: usize,
}
