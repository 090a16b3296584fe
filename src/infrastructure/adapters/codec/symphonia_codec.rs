//! Symphonia Codec - 基于 symphonia 的音频编解码器
//!
//! 支持：
//! - WAV / MP3 解码为 PCM（旁白与背景素材）
//! - WAV 头解析和信息提取
//! - PCM → 16 位 WAV 编码
//! - PCM → Opus (OGG 容器) 编码，只接受 Opus 原生采样率，不做重采样

use ogg::writing::PacketWriter;
use opus::{Application, Channels, Encoder};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, AudioFormat, CodecError, EncodeConfig};
use crate::domain::PcmBuffer;

/// Opus 支持的采样率
pub const OPUS_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Opus 最大包大小
const MAX_OPUS_PACKET: usize = 4000;

/// 音频编解码器
#[derive(Debug, Clone, Default)]
pub struct SymphoniaCodec;

impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }

    /// 使用 symphonia 解码为交错 f32 PCM
    fn decode_to_pcm(&self, data: &[u8], extension_hint: Option<&str>) -> Result<PcmBuffer, CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension_hint {
            hint.with_extension(ext);
        }

        let opened = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::DecodingError(format!("Unrecognized container: {}", e)))?;

        let mut format = opened.format;
        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let track_id = track.id;
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(error = %e, "Decode error (skipping packet)");
                    continue;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(e.to_string()));
                }
            };

            let spec = *decoded.spec();
            // MP3 的声道与采样率要到解出第一帧才确定
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count() as u16);

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        let sample_rate = sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;
        let channels =
            channels.ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        if samples.is_empty() {
            return Err(CodecError::DecodingError("No audio frames decoded".to_string()));
        }

        PcmBuffer::new(samples, sample_rate, channels)
            .map_err(|e| CodecError::DecodingError(e.to_string()))
    }

    /// 将 PCM f32 样本编码为 16 位 WAV
    fn encode_wav(&self, pcm: &PcmBuffer) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let num_channels = pcm.channels();
        let sample_rate = pcm.sample_rate();
        let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let data_size = pcm.samples().len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for &s in pcm.samples() {
            wav.extend_from_slice(&to_i16(s).to_le_bytes());
        }

        wav
    }

    /// 将 PCM f32 样本编码为 Opus (OGG 容器)
    fn encode_opus(&self, pcm: &PcmBuffer, bitrate: u32) -> Result<Vec<u8>, CodecError> {
        let sample_rate = pcm.sample_rate();
        if !OPUS_SAMPLE_RATES.contains(&sample_rate) {
            return Err(CodecError::UnsupportedFormat(format!(
                "Opus does not support {} Hz; render at one of {:?} or use wav",
                sample_rate, OPUS_SAMPLE_RATES
            )));
        }

        let (channels, channel_count) = match pcm.channels() {
            1 => (Channels::Mono, 1usize),
            2 => (Channels::Stereo, 2usize),
            n => {
                return Err(CodecError::UnsupportedFormat(format!(
                    "Opus output supports mono or stereo, got {} channels",
                    n
                )))
            }
        };

        let mut encoder = Encoder::new(sample_rate, channels, Application::Audio).map_err(|e| {
            CodecError::EncodingError(format!("Failed to create Opus encoder: {}", e))
        })?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(bitrate as i32))
            .map_err(|e| CodecError::EncodingError(format!("Failed to set bitrate: {}", e)))?;

        // lookahead 以编码器采样率计
        let lookahead = encoder.get_lookahead().map(|l| l.max(0) as usize).unwrap_or(0);

        let pcm_i16: Vec<i16> = pcm.samples().iter().map(|&s| to_i16(s)).collect();

        // 20ms 一帧
        let frame_size = (sample_rate as usize * 20) / 1000;
        let samples_per_frame = frame_size * channel_count;

        // pre-skip 与 granule position 均以 48kHz 计 (RFC 7845)
        let granule_scale = 48000 / sample_rate as u64;
        let pre_skip = u16::try_from(lookahead as u64 * granule_scale).map_err(|_| {
            CodecError::EncodingError(format!("Opus lookahead too large: {}", lookahead))
        })?;
        let frame_granule = frame_size as u64 * granule_scale;
        // 末包的 granule 决定解码端裁掉尾部填充后的真实长度
        let final_granule = pre_skip as u64 + pcm.frames() as u64 * granule_scale;

        let flush_frames = ((lookahead + frame_size - 1) / frame_size).max(1);

        let mut ogg_data = Vec::new();
        {
            let mut packet_writer = PacketWriter::new(&mut ogg_data);
            let write_err =
                |e: std::io::Error| CodecError::EncodingError(format!("Ogg write failed: {}", e));

            packet_writer
                .write_packet(
                    opus_head(channel_count as u8, sample_rate, pre_skip),
                    0,
                    ogg::PacketWriteEndInfo::EndPage,
                    0,
                )
                .map_err(write_err)?;
            packet_writer
                .write_packet(opus_tags(), 0, ogg::PacketWriteEndInfo::EndPage, 0)
                .map_err(write_err)?;

            let mut output_buf = vec![0u8; MAX_OPUS_PACKET];
            let silence = vec![0i16; samples_per_frame];
            let frames = pcm_i16
                .chunks(samples_per_frame)
                .map(|chunk| {
                    let mut frame = chunk.to_vec();
                    frame.resize(samples_per_frame, 0);
                    frame
                })
                .chain(std::iter::repeat(silence).take(flush_frames));
            let total = (pcm_i16.len() + samples_per_frame - 1) / samples_per_frame + flush_frames;

            for (i, frame) in frames.enumerate() {
                let encoded_len = encoder
                    .encode(&frame, &mut output_buf)
                    .map_err(|e| CodecError::EncodingError(format!("Opus encode failed: {}", e)))?;

                let (end_info, granule_pos) = if i + 1 == total {
                    (ogg::PacketWriteEndInfo::EndStream, final_granule)
                } else {
                    (
                        ogg::PacketWriteEndInfo::NormalPacket,
                        ((i as u64 + 1) * frame_granule).min(final_granule),
                    )
                };
                packet_writer
                    .write_packet(output_buf[..encoded_len].to_vec(), 0, end_info, granule_pos)
                    .map_err(write_err)?;
            }
        }

        Ok(ogg_data)
    }
}

fn to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Opus Head 包 (RFC 7845)
fn opus_head(channels: u8, sample_rate: u32, pre_skip: u16) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(channels);
    head.extend_from_slice(&pre_skip.to_le_bytes());
    head.extend_from_slice(&sample_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // channel mapping family
    head
}

/// Opus Tags 包
fn opus_tags() -> Vec<u8> {
    let vendor = "narramix";
    let mut tags = Vec::new();
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor.as_bytes());
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}

impl AudioCodecPort for SymphoniaCodec {
    fn decode(&self, data: &[u8], extension_hint: Option<&str>) -> Result<PcmBuffer, CodecError> {
        if data.is_empty() {
            return Err(CodecError::InvalidInput("empty audio data".to_string()));
        }
        self.decode_to_pcm(data, extension_hint)
    }

    fn encode(&self, pcm: &PcmBuffer, config: &EncodeConfig) -> Result<Vec<u8>, CodecError> {
        let output = match config.format {
            AudioFormat::Wav => self.encode_wav(pcm),
            AudioFormat::Opus => self.encode_opus(pcm, config.bitrate)?,
        };

        tracing::debug!(
            format = %config.format,
            format_label = %pcm.format_label(),
            frames = pcm.frames(),
            size = output.len(),
            "Audio encoded"
        );
        Ok(output)
    }

    fn supports_format(&self, format: AudioFormat) -> bool {
        match format {
            AudioFormat::Wav | AudioFormat::Opus => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(secs: f64, rate: u32, channels: u16) -> PcmBuffer {
        let frames = (secs * rate as f64) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let v = (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / rate as f32).sin() * 0.5;
            for _ in 0..channels {
                samples.push(v);
            }
        }
        PcmBuffer::new(samples, rate, channels).unwrap()
    }

    #[test]
    fn test_wav_header_fields() {
        let codec = SymphoniaCodec::new();
        let wav = codec.encode(&sine(1.0, 16000, 1), &EncodeConfig::default()).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16000);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 32000);
        assert_eq!(wav.len(), 44 + 32000);
    }

    #[test]
    fn test_wav_decode_preserves_format_and_length() {
        let codec = SymphoniaCodec::new();
        let original = sine(1.5, 22050, 2);
        let wav = codec.encode(&original, &EncodeConfig::default()).unwrap();

        let decoded = codec.decode(&wav, Some("wav")).unwrap();
        assert_eq!(decoded.sample_rate(), 22050);
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.frames(), original.frames());
        let diff = (decoded.samples()[100] - original.samples()[100]).abs();
        assert!(diff < 1e-3);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = SymphoniaCodec::new();
        assert!(codec.decode(b"definitely not audio", Some("wav")).is_err());
        assert!(matches!(
            codec.decode(&[], None),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_opus() {
        let codec = SymphoniaCodec::new();
        let pcm = sine(1.0, 24000, 1);
        let wav_len = codec.encode(&pcm, &EncodeConfig::default()).unwrap().len();

        let opus = codec
            .encode(
                &pcm,
                &EncodeConfig {
                    format: AudioFormat::Opus,
                    bitrate: 32000,
                },
            )
            .unwrap();
        assert_eq!(&opus[0..4], b"OggS");
        assert!(opus.len() < wav_len);
    }

    #[test]
    fn test_opus_granules_at_48k() {
        let codec = SymphoniaCodec::new();
        let pcm = sine(0.5, 16000, 1);
        let opus = codec
            .encode(
                &pcm,
                &EncodeConfig {
                    format: AudioFormat::Opus,
                    bitrate: 24000,
                },
            )
            .unwrap();

        let lookahead = Encoder::new(16000, Channels::Mono, Application::Audio)
            .unwrap()
            .get_lookahead()
            .unwrap() as u64;

        let mut reader = ogg::reading::PacketReader::new(Cursor::new(opus));
        let head = reader.read_packet().unwrap().unwrap();
        assert_eq!(&head.data[0..8], b"OpusHead");
        let pre_skip = u16::from_le_bytes([head.data[10], head.data[11]]) as u64;
        assert_eq!(pre_skip, lookahead * 3);
        assert_eq!(
            u32::from_le_bytes([head.data[12], head.data[13], head.data[14], head.data[15]]),
            16000
        );

        let mut last_granule = 0;
        while let Some(packet) = reader.read_packet().unwrap() {
            assert!(packet.absgp_page() >= last_granule);
            last_granule = packet.absgp_page();
        }
        // 0.5s @ 48kHz
        assert_eq!(last_granule, pre_skip + 24000);
    }

    #[test]
    fn test_opus_refuses_non_native_rate() {
        let codec = SymphoniaCodec::new();
        let err = codec
            .encode(
                &sine(0.2, 44100, 2),
                &EncodeConfig {
                    format: AudioFormat::Opus,
                    bitrate: 64000,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_supports_format() {
        let codec = SymphoniaCodec::new();
        assert!(codec.supports_format(AudioFormat::Wav));
        assert!(codec.supports_format(AudioFormat::Opus));
    }
}
