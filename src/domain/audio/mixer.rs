//! 混音器
//!
//! 契约：输出时长恰好等于旁白时长，背景总是被循环或裁剪以适配旁白，反之不成立。
//!
//! 两种模式共用 `overlay` 与 `GainEnvelope`：
//! - `mix`: 整段旁白配一条背景
//! - `mix_regions`: 已拼接好的旁白上按段落偏移铺设多条背景，区域边界交叉淡化

use super::envelope::{GainEnvelope, MixSettings, MixingEnvelope};
use super::errors::MixError;
use super::pcm::{secs_to_frames, PcmBuffer};

/// 将背景适配到指定帧数
///
/// - 背景短于目标：无缝循环
/// - 背景不短于目标：从头裁剪
///
/// 返回适配后的缓冲与背景被播放的次数
pub fn adapt_background(background: &PcmBuffer, frames: usize) -> Result<(PcmBuffer, usize), MixError> {
    let bg_frames = background.frames();
    if bg_frames == 0 {
        return Err(MixError::EmptyBackground);
    }

    let channels = background.channels() as usize;
    let wanted = frames * channels;

    if bg_frames >= frames {
        let trimmed = background.samples()[..wanted].to_vec();
        let buffer = PcmBuffer::new(trimmed, background.sample_rate(), background.channels())?;
        return Ok((buffer, 1));
    }

    let loop_count = frames.div_ceil(bg_frames);
    let samples: Vec<f32> = background
        .samples()
        .iter()
        .copied()
        .cycle()
        .take(wanted)
        .collect();
    let buffer = PcmBuffer::new(samples, background.sample_rate(), background.channels())?;

    Ok((buffer, loop_count))
}

/// 将背景按包络叠加到 `out` 的 [start_frame, start_frame + envelope.total_frames())
fn overlay(
    out: &mut PcmBuffer,
    background: &PcmBuffer,
    start_frame: usize,
    envelope: &GainEnvelope,
) -> Result<usize, MixError> {
    out.ensure_same_format(background)?;

    let total = envelope.total_frames();
    if start_frame + total > out.frames() {
        return Err(MixError::InvalidRegion(format!(
            "region {}..{} exceeds {} frames",
            start_frame,
            start_frame + total,
            out.frames()
        )));
    }
    if total == 0 {
        return Ok(0);
    }

    let (adapted, loop_count) = adapt_background(background, total)?;
    let channels = out.channels() as usize;
    let bg = adapted.samples();
    let dst = out.samples_mut();

    for frame in 0..total {
        let gain = envelope.gain_at(frame);
        if gain == 0.0 {
            continue;
        }
        let src = frame * channels;
        let base = (start_frame + frame) * channels;
        for ch in 0..channels {
            dst[base + ch] += bg[src + ch] * gain;
        }
    }

    Ok(loop_count)
}

/// 单次混音结果
#[derive(Debug, Clone)]
pub struct MixOutput {
    pub buffer: PcmBuffer,
    pub envelope: MixingEnvelope,
}

/// 已拼接旁白中的一个背景区域
#[derive(Debug, Clone, Copy)]
pub struct BackgroundRegion<'a> {
    /// 区域起始帧（含）
    pub start_frame: usize,
    /// 区域结束帧（不含）
    pub end_frame: usize,
    pub background: &'a PcmBuffer,
}

/// 混音器
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    settings: MixSettings,
}

impl Mixer {
    pub fn new(settings: MixSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MixSettings {
        &self.settings
    }

    fn narration_stage(&self, narration: &PcmBuffer) -> PcmBuffer {
        let mut out = narration.clone();
        out.apply_gain(self.settings.narration_gain);
        out
    }

    /// 单段混音：一条背景覆盖整段旁白
    ///
    /// 背景与旁白必须格式一致（调用方先用 `conform_to` 对齐）
    pub fn mix(&self, narration: &PcmBuffer, background: &PcmBuffer) -> Result<MixOutput, MixError> {
        narration.ensure_same_format(background)?;

        let total = narration.frames();
        let mut out = self.narration_stage(narration);
        let envelope = GainEnvelope::from_secs(
            self.settings.effective_background_gain(),
            total,
            self.settings.fade_in_secs,
            self.settings.fade_out_secs,
            narration.sample_rate(),
        );
        let loop_count = overlay(&mut out, background, 0, &envelope)?;

        let rate = narration.sample_rate() as f64;
        Ok(MixOutput {
            buffer: out,
            envelope: MixingEnvelope {
                narration_gain: self.settings.narration_gain,
                background_gain: envelope.target(),
                fade_in_secs: envelope.fade_in_frames() as f64 / rate,
                fade_out_secs: envelope.fade_out_frames() as f64 / rate,
                loop_count,
            },
        })
    }

    /// 多区域混音：按段落偏移铺设背景，相邻区域交叉淡化
    ///
    /// 非末尾区域向后延伸 `crossfade_secs` 并在延伸段淡出，后一区域在起点同步淡入；
    /// 首个区域使用 `fade_in_secs`，末尾区域使用 `fade_out_secs`。
    pub fn mix_regions(
        &self,
        narration: &PcmBuffer,
        regions: &[BackgroundRegion<'_>],
    ) -> Result<PcmBuffer, MixError> {
        let total = narration.frames();
        let rate = narration.sample_rate();
        let mut previous_start = 0;
        for region in regions {
            if region.start_frame >= region.end_frame || region.end_frame > total {
                return Err(MixError::InvalidRegion(format!(
                    "{}..{} within {} frames",
                    region.start_frame, region.end_frame, total
                )));
            }
            if region.start_frame < previous_start {
                return Err(MixError::InvalidRegion("regions are not ordered".to_string()));
            }
            previous_start = region.start_frame;
        }

        let mut out = self.narration_stage(narration);
        let target = self.settings.effective_background_gain();
        let crossfade = secs_to_frames(self.settings.crossfade_secs, rate);
        let fade_in = secs_to_frames(self.settings.fade_in_secs, rate);
        let fade_out = secs_to_frames(self.settings.fade_out_secs, rate);
        let last = regions.len().saturating_sub(1);

        for (i, region) in regions.iter().enumerate() {
            let end = if i == last {
                region.end_frame
            } else {
                (region.end_frame + crossfade).min(total)
            };
            let length = end - region.start_frame;
            let region_fade_in = if i == 0 { fade_in } else { crossfade };
            let region_fade_out = if i == last {
                fade_out
            } else {
                end - region.end_frame
            };

            let envelope = GainEnvelope::new(target, length, region_fade_in, region_fade_out);
            overlay(&mut out, region.background, region.start_frame, &envelope)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn constant(frames: usize, value: f32) -> PcmBuffer {
        PcmBuffer::new(vec![value; frames], RATE, 1).unwrap()
    }

    fn ramp(frames: usize) -> PcmBuffer {
        PcmBuffer::new((0..frames).map(|i| i as f32 / frames as f32).collect(), RATE, 1).unwrap()
    }

    #[test]
    fn test_adapt_trims_from_start() {
        let (out, loops) = adapt_background(&ramp(100), 40).unwrap();
        assert_eq!(out.frames(), 40);
        assert_eq!(loops, 1);
        assert_eq!(out.samples()[..40], ramp(100).samples()[..40]);
    }

    #[test]
    fn test_adapt_loops_seamlessly() {
        let bg = ramp(10);
        let (out, loops) = adapt_background(&bg, 25).unwrap();
        assert_eq!(out.frames(), 25);
        assert_eq!(loops, 3);
        assert_eq!(out.samples()[10], bg.samples()[0]);
        assert_eq!(out.samples()[24], bg.samples()[4]);
    }

    #[test]
    fn test_adapt_empty_background() {
        assert!(matches!(
            adapt_background(&constant(0, 0.0), 10),
            Err(MixError::EmptyBackground)
        ));
    }

    #[test]
    fn test_loop_background_to_fill_narration() {
        // 背景 5s，旁白 12s
        let mixer = Mixer::default();
        let narration = constant(12 * RATE as usize, 0.0);
        let background = constant(5 * RATE as usize, 1.0);

        let result = mixer.mix(&narration, &background).unwrap();
        let out = result.buffer.samples();
        assert_eq!(result.buffer.frames(), narration.frames());
        assert_eq!(result.envelope.loop_count, 3);

        let target = MixSettings::default().effective_background_gain();
        assert_eq!(out[0], 0.0);
        assert!((out[6000] - target).abs() < 1e-6);
        // 淡出恰好在 12s 处结束
        assert_eq!(out[out.len() - 1], 0.0);
        assert!(out[out.len() - 2] > 0.0);
        assert!((result.envelope.fade_out_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_duration_equals_narration() {
        let mixer = Mixer::default();
        for (narration_frames, bg_frames) in [(1, 1), (1, 5000), (999, 1000), (1000, 999), (4321, 17), (0, 10)] {
            let narration = constant(narration_frames, 0.1);
            let background = constant(bg_frames, 0.5);
            let out = mixer.mix(&narration, &background).unwrap();
            assert_eq!(out.buffer.frames(), narration_frames);
        }
    }

    #[test]
    fn test_narration_gain_applied() {
        let mixer = Mixer::new(MixSettings {
            narration_gain: 0.8,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
            ..Default::default()
        });
        let narration = constant(100, 0.5);
        let background = constant(100, 0.0);
        let out = mixer.mix(&narration, &background).unwrap();
        assert!(out.buffer.samples().iter().all(|&s| (s - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_format_mismatch_rejected() {
        let mixer = Mixer::default();
        let narration = constant(100, 0.0);
        let background = PcmBuffer::silence(100, 2 * RATE, 1);
        assert!(matches!(
            mixer.mix(&narration, &background),
            Err(MixError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_regions_crossfade() {
        let mixer = Mixer::new(MixSettings {
            fade_in_secs: 0.1,
            fade_out_secs: 0.1,
            crossfade_secs: 0.2,
            ..Default::default()
        });
        let narration = constant(3000, 0.0);
        let a = constant(700, 1.0);
        let b = constant(700, 1.0);
        let regions = [
            BackgroundRegion { start_frame: 0, end_frame: 1500, background: &a },
            BackgroundRegion { start_frame: 1500, end_frame: 3000, background: &b },
        ];

        let out = mixer.mix_regions(&narration, &regions).unwrap();
        let samples = out.samples();
        let target = mixer.settings().effective_background_gain();

        assert_eq!(out.frames(), 3000);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1000] - target).abs() < 1e-6);
        // 交叉淡化区间内两条背景之和接近目标增益
        assert!((samples[1600] - target).abs() < target * 0.02);
        assert_eq!(samples[2999], 0.0);
    }

    #[test]
    fn test_regions_validation() {
        let mixer = Mixer::default();
        let narration = constant(100, 0.0);
        let bg = constant(10, 1.0);
        let out_of_bounds = [BackgroundRegion { start_frame: 50, end_frame: 150, background: &bg }];
        assert!(mixer.mix_regions(&narration, &out_of_bounds).is_err());

        let unordered = [
            BackgroundRegion { start_frame: 50, end_frame: 60, background: &bg },
            BackgroundRegion { start_frame: 10, end_frame: 20, background: &bg },
        ];
        assert!(mixer.mix_regions(&narration, &unordered).is_err());
    }
}
