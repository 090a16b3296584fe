//! 格式对齐
//!
//! 背景素材与旁白的采样率/声道数不一致时，混音前显式转换背景素材；
//! 合成服务返回的段落格式与首段不一致时同样转换。编码阶段从不做重采样。

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::errors::MixError;
use super::pcm::PcmBuffer;

/// 声道重排
///
/// - 单声道 → 多声道：复制
/// - 多声道 → 单声道：取平均
/// - 其他：按下标映射，缺失声道复制最后一个源声道
fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = from as usize;
    let to = to as usize;
    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            let sum: f32 = frame.iter().sum();
            out.push(sum / from as f32);
        } else {
            for ch in 0..to {
                out.push(frame[ch.min(from - 1)]);
            }
        }
    }

    out
}

/// 重采样器参数：sinc 插值 + BlackmanHarris2 窗
fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// 交错样本拆成按声道的平面数据
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

fn interleave(planes: &[Vec<f32>], frames: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames * planes.len());
    for i in 0..frames {
        for plane in planes {
            out.push(plane.get(i).copied().unwrap_or(0.0));
        }
    }
    out
}

/// 基于 rubato `SincFixedIn` 的重采样
///
/// 整段一次送入，再用空输入冲出滤波器尾部；跳过 `output_delay` 后
/// 截取 `round(frames * ratio)` 帧，保证时长不变
fn resample(
    samples: &[f32],
    from_rate: u32,
    to_rate: u32,
    channels: u16,
) -> Result<Vec<f32>, MixError> {
    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let target_frames = (frame_count as f64 * ratio).round() as usize;

    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, sinc_params(), frame_count, channel_count)
            .map_err(|e| MixError::Resample(e.to_string()))?;

    let input = deinterleave(samples, channel_count);
    let mut planes = resampler
        .process(&input[..], None)
        .map_err(|e| MixError::Resample(e.to_string()))?;
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| MixError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    for (plane, rest) in planes.iter_mut().zip(tail) {
        plane.extend(rest);
        plane.drain(..delay.min(plane.len()));
    }

    Ok(interleave(&planes, target_frames))
}

/// 将缓冲转换为指定采样率与声道数，格式一致时原样返回
pub fn conform_to(
    buffer: PcmBuffer,
    sample_rate: u32,
    channels: u16,
) -> Result<PcmBuffer, MixError> {
    if buffer.sample_rate() == sample_rate && buffer.channels() == channels {
        return Ok(buffer);
    }

    tracing::debug!(
        from = %buffer.format_label(),
        to_rate = sample_rate,
        to_channels = channels,
        "Conforming buffer format"
    );

    let from_rate = buffer.sample_rate();
    let from_channels = buffer.channels();
    let mut samples = buffer.into_samples();

    if from_channels != channels {
        samples = remap_channels(&samples, from_channels, channels);
    }
    if from_rate != sample_rate {
        samples = resample(&samples, from_rate, sample_rate, channels)?;
    }

    PcmBuffer::new(samples, sample_rate, channels)
}
