//! Narration Pipeline - 单个渲染任务的端到端编排
//!
//! 分段（同步，先于任何音频工作完成）→ 各段落并发执行
//! 分类 → 合成 → 选曲 → 混音，结果带段落索引 → 按原文顺序拼接 → 编码 → 交给存储。
//!
//! 任一段落失败即中止整个任务并报告段落索引；取消令牌在每个阶段之间检查。
//! 解码、混音、编码都放到阻塞线程池执行。

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::application::error::PipelineError;
use crate::application::ports::{
    generate_cache_key, ArtifactStoragePort, AssetStorePort, AudioCodecPort, AudioFormat,
    CacheMetadata, EncodeConfig, MoodClassifierPort, NarrationCachePort, ProgressReporter,
    RenderJob, RenderResult, SynthesisRequest, TtsEnginePort,
};
use crate::application::services::music_resolver::MusicResolver;
use crate::application::services::retry::{retry_with_timeout, RetryError, RetryPolicy};
use crate::domain::{
    conform_to, segment_text, BackgroundRegion, BackgroundTrack, MixSettings, Mixer,
    MoodMetadata, ParagraphUnit, PcmBuffer, SegmentConfig, Sequencer,
};

/// 混音模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    /// 每段旁白单独混音后再拼接
    #[default]
    PerParagraph,
    /// 先拼接全部旁白，再按段落区域铺设背景并交叉淡化
    Timeline,
}

/// 流水线参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub segment: SegmentConfig,
    pub mix: MixSettings,
    /// 段落之间的静音时长（秒）
    pub gap_secs: f64,
    pub mix_mode: MixMode,
    pub opus_bitrate: u32,
    /// 单个任务内并发处理的段落数
    pub max_concurrent_paragraphs: usize,
    pub tts_retry: RetryPolicy,
    pub classifier_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            mix: MixSettings::default(),
            gap_secs: 3.0,
            mix_mode: MixMode::PerParagraph,
            opus_bitrate: 64000,
            max_concurrent_paragraphs: 4,
            tts_retry: RetryPolicy::default(),
            classifier_retry: RetryPolicy::default(),
        }
    }
}

/// 渲染请求
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub job_id: String,
    pub title: String,
    pub text: String,
    pub voice_ref: String,
    pub output_format: AudioFormat,
}

impl From<&RenderJob> for RenderRequest {
    fn from(job: &RenderJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            title: job.title.clone(),
            text: job.text.clone(),
            voice_ref: job.voice_ref.clone(),
            output_format: job.output_format,
        }
    }
}

/// 单个任务的作用域状态，任务结束即释放
struct JobContext<'a> {
    request: &'a RenderRequest,
    cancel: &'a CancellationToken,
    /// 已解码的背景素材（按素材路径）
    backgrounds: DashMap<String, Arc<PcmBuffer>>,
}

/// 单个段落的处理结果
struct ProcessedParagraph {
    unit: ParagraphUnit,
    /// 时间线模式下保留已对齐格式的背景
    background: Option<PcmBuffer>,
}

/// Narration Pipeline
pub struct NarrationPipeline {
    config: PipelineConfig,
    classifier: Arc<dyn MoodClassifierPort>,
    tts: Arc<dyn TtsEnginePort>,
    resolver: Arc<MusicResolver>,
    assets: Arc<dyn AssetStorePort>,
    codec: Arc<dyn AudioCodecPort>,
    storage: Arc<dyn ArtifactStoragePort>,
    cache: Option<Arc<dyn NarrationCachePort>>,
    mixer: Mixer,
}

impl NarrationPipeline {
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn MoodClassifierPort>,
        tts: Arc<dyn TtsEnginePort>,
        resolver: Arc<MusicResolver>,
        assets: Arc<dyn AssetStorePort>,
        codec: Arc<dyn AudioCodecPort>,
        storage: Arc<dyn ArtifactStoragePort>,
    ) -> Self {
        let mixer = Mixer::new(config.mix);
        Self {
            config,
            classifier,
            tts,
            resolver,
            assets,
            codec,
            storage,
            cache: None,
            mixer,
        }
    }

    /// 启用旁白缓存
    pub fn with_cache(mut self, cache: Arc<dyn NarrationCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 执行一个渲染任务
    ///
    /// 成功时返回可访问的成品引用；失败时返回标明阶段与段落索引的错误，
    /// 不会暴露部分结果。
    pub async fn run(
        &self,
        request: &RenderRequest,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<RenderResult, PipelineError> {
        let job_id = request.job_id.as_str();

        let segmentation = segment_text(&request.text, &self.config.segment)?;
        let total = segmentation.len();
        tracing::info!(
            job_id,
            paragraphs = total,
            strategy = ?segmentation.strategy,
            dropped_units = segmentation.dropped_units,
            "Text segmented"
        );
        progress.segmented(job_id, total);

        let units = ParagraphUnit::from_paragraphs(segmentation.paragraphs);
        let ctx = JobContext {
            request,
            cancel,
            backgrounds: DashMap::new(),
        };

        let mut processed = Vec::with_capacity(total);
        {
            let mut results = stream::iter(units)
                .map(|unit| self.process_paragraph(unit, &ctx))
                .buffer_unordered(self.config.max_concurrent_paragraphs.max(1));

            // 首个失败即返回，未完成的段落随 stream 一起丢弃
            while let Some(result) = results.next().await {
                let paragraph = result?;
                progress.paragraph_completed(job_id, paragraph.unit.index(), processed.len() + 1, total);
                processed.push(paragraph);
            }
        }
        drop(ctx);
        check_cancelled(cancel)?;

        processed.sort_by_key(|p| p.unit.index());
        let final_track = self.assemble(processed).await?;
        check_cancelled(cancel)?;

        let sample_rate = final_track.sample_rate();
        let channels = final_track.channels();
        let duration_ms = final_track.duration_ms();
        let encoded = self.encode(final_track, request.output_format).await?;
        check_cancelled(cancel)?;

        let logical_path = format!("renders/{}.{}", job_id, request.output_format.extension());
        let stored = self
            .storage
            .store(&logical_path, encoded)
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        tracing::info!(
            job_id,
            url = %stored.url,
            duration_ms,
            sample_rate,
            channels,
            size_bytes = stored.size_bytes,
            "Render completed"
        );

        Ok(RenderResult {
            url: stored.url,
            path: stored.path,
            duration_ms,
            sample_rate,
            channels,
            paragraphs: total,
            size_bytes: stored.size_bytes,
            format: request.output_format,
        })
    }

    async fn process_paragraph(
        &self,
        mut unit: ParagraphUnit,
        ctx: &JobContext<'_>,
    ) -> Result<ProcessedParagraph, PipelineError> {
        let index = unit.index();

        check_cancelled(ctx.cancel)?;
        let mood = self.classify(&unit, ctx).await?;
        unit.set_mood(mood.clone());

        check_cancelled(ctx.cancel)?;
        let narration = self.synthesize(&unit, &mood, ctx).await?;

        check_cancelled(ctx.cancel)?;
        let mut track = self.resolver.resolve(&mood).await;
        let background = self.load_background(&mut track, index, ctx).await?;
        tracing::debug!(
            job_id = %ctx.request.job_id,
            paragraph = index,
            category = %track.category,
            asset_index = track.index,
            resolution = ?track.resolution,
            "Background resolved"
        );
        unit.set_background(track);

        check_cancelled(ctx.cancel)?;
        let rate = narration.sample_rate();
        let channels = narration.channels();
        if background.sample_rate() != rate || background.channels() != channels {
            tracing::info!(
                job_id = %ctx.request.job_id,
                paragraph = index,
                from = %background.format_label(),
                to = %narration.format_label(),
                "Conforming background to narration format"
            );
        }

        match self.config.mix_mode {
            MixMode::PerParagraph => {
                let mixer = self.mixer.clone();
                let output = tokio::task::spawn_blocking(move || {
                    let background = conform_to((*background).clone(), rate, channels)?;
                    mixer.mix(&narration, &background)
                })
                .await
                .map_err(|e| join_error(Some(index), e))?
                .map_err(|e| PipelineError::Mixing {
                    index,
                    message: e.to_string(),
                })?;

                tracing::debug!(
                    job_id = %ctx.request.job_id,
                    paragraph = index,
                    duration_ms = output.buffer.duration_ms(),
                    loop_count = output.envelope.loop_count,
                    background_gain = output.envelope.background_gain,
                    "Paragraph mixed"
                );
                unit.set_mixed(output.buffer);
                Ok(ProcessedParagraph {
                    unit,
                    background: None,
                })
            }
            MixMode::Timeline => {
                let conformed = tokio::task::spawn_blocking(move || {
                    conform_to((*background).clone(), rate, channels)
                })
                .await
                .map_err(|e| join_error(Some(index), e))?
                .map_err(|e| PipelineError::Mixing {
                    index,
                    message: e.to_string(),
                })?;
                unit.set_narration(narration);
                Ok(ProcessedParagraph {
                    unit,
                    background: Some(conformed),
                })
            }
        }
    }

    /// 分类失败不中止任务，替换为默认元数据
    async fn classify(
        &self,
        unit: &ParagraphUnit,
        ctx: &JobContext<'_>,
    ) -> Result<MoodMetadata, PipelineError> {
        let text = unit.raw_text();
        let result = retry_with_timeout(&self.config.classifier_retry, ctx.cancel, "classify", |_| {
            self.classifier.classify(text)
        })
        .await;

        match result {
            Ok(mood) => Ok(mood),
            Err(RetryError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    job_id = %ctx.request.job_id,
                    paragraph = unit.index(),
                    attempts = e.attempts(),
                    error = %e.message(),
                    "Classification failed, using default mood"
                );
                Ok(MoodMetadata::fallback())
            }
        }
    }

    /// 合成并解码旁白，优先读取缓存
    async fn synthesize(
        &self,
        unit: &ParagraphUnit,
        mood: &MoodMetadata,
        ctx: &JobContext<'_>,
    ) -> Result<PcmBuffer, PipelineError> {
        let index = unit.index();
        let voice_ref = &ctx.request.voice_ref;
        let speed = mood.tempo.speed_factor();
        let cache_key = generate_cache_key(unit.raw_text(), voice_ref, speed);

        let cached = match &self.cache {
            Some(cache) => match cache.get(&cache_key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(cache_key = %cache_key, error = %e, "Narration cache read failed");
                    None
                }
            },
            None => None,
        };

        let from_cache = cached.is_some();
        let audio_data = match cached {
            Some(data) => {
                tracing::debug!(job_id = %ctx.request.job_id, paragraph = index, "Narration cache hit");
                data
            }
            None => {
                let request = SynthesisRequest {
                    text: unit.raw_text().to_string(),
                    voice_ref: voice_ref.clone(),
                    speed,
                    paragraph_index: index,
                };
                let response =
                    retry_with_timeout(&self.config.tts_retry, ctx.cancel, "synthesize", |_| {
                        self.tts.synthesize(request.clone())
                    })
                    .await
                    .map_err(|e| match e {
                        RetryError::Cancelled => PipelineError::Cancelled,
                        other => PipelineError::Synthesis {
                            index,
                            attempts: other.attempts(),
                            message: other.message(),
                        },
                    })?;

                if let Some(cache) = &self.cache {
                    let metadata = CacheMetadata {
                        voice_ref: voice_ref.clone(),
                        duration_ms: response.duration_ms.unwrap_or(0),
                        sample_rate: response.sample_rate,
                    };
                    if let Err(e) = cache.put(&cache_key, response.audio_data.clone(), metadata).await {
                        tracing::warn!(cache_key = %cache_key, error = %e, "Failed to cache narration");
                    }
                }
                response.audio_data
            }
        };

        let codec = self.codec.clone();
        let decoded = tokio::task::spawn_blocking(move || codec.decode(&audio_data, None))
            .await
            .map_err(|e| join_error(Some(index), e))?;
        let narration = match decoded {
            Ok(narration) => narration,
            Err(e) => {
                // 损坏的缓存条目不再命中，下次重新合成
                if let (true, Some(cache)) = (from_cache, &self.cache) {
                    tracing::warn!(cache_key = %cache_key, error = %e, "Dropping undecodable cached narration");
                    if let Err(e) = cache.remove(&cache_key).await {
                        tracing::warn!(cache_key = %cache_key, error = %e, "Failed to remove cache entry");
                    }
                }
                return Err(PipelineError::Render {
                    index: Some(index),
                    message: format!("undecodable narration: {}", e),
                });
            }
        };

        if narration.is_empty() {
            return Err(PipelineError::Synthesis {
                index,
                attempts: 1,
                message: "synthesizer returned empty audio".to_string(),
            });
        }

        tracing::debug!(
            job_id = %ctx.request.job_id,
            paragraph = index,
            duration_ms = narration.duration_ms(),
            format = %narration.format_label(),
            "Narration ready"
        );
        Ok(narration)
    }

    /// 读取并解码背景素材；素材不可用时退到兜底素材，兜底也不可用才报错
    async fn load_background(
        &self,
        track: &mut BackgroundTrack,
        index: usize,
        ctx: &JobContext<'_>,
    ) -> Result<Arc<PcmBuffer>, PipelineError> {
        match self.load_asset(&track.asset_path, ctx).await {
            Ok(buffer) => {
                track.duration_secs = buffer.duration_secs();
                return Ok(buffer);
            }
            Err(message) if track.is_last_resort() => {
                return Err(PipelineError::AssetResolution {
                    index: Some(index),
                    message,
                });
            }
            Err(message) => {
                tracing::warn!(
                    job_id = %ctx.request.job_id,
                    paragraph = index,
                    path = %track.asset_path,
                    error = %message,
                    "Background asset unusable, switching to last resort"
                );
            }
        }

        *track = self.resolver.last_resort();
        let buffer = self
            .load_asset(&track.asset_path, ctx)
            .await
            .map_err(|message| PipelineError::AssetResolution {
                index: Some(index),
                message,
            })?;
        track.duration_secs = buffer.duration_secs();
        Ok(buffer)
    }

    async fn load_asset(&self, path: &str, ctx: &JobContext<'_>) -> Result<Arc<PcmBuffer>, String> {
        if let Some(entry) = ctx.backgrounds.get(path) {
            return Ok(entry.value().clone());
        }

        let data = self.assets.read(path).await.map_err(|e| e.to_string())?;
        let hint = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        let codec = self.codec.clone();
        let buffer = tokio::task::spawn_blocking(move || codec.decode(&data, hint.as_deref()))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| format!("undecodable asset {}: {}", path, e))?;
        if buffer.is_empty() {
            return Err(format!("asset {} contains no audio", path));
        }

        Ok(ctx
            .backgrounds
            .entry(path.to_string())
            .or_insert(Arc::new(buffer))
            .value()
            .clone())
    }

    /// 按原文顺序拼接，得到最终音轨
    async fn assemble(&self, processed: Vec<ProcessedParagraph>) -> Result<PcmBuffer, PipelineError> {
        let mode = self.config.mix_mode;
        let sequencer = Sequencer::new(self.config.gap_secs);
        let mixer = self.mixer.clone();

        tokio::task::spawn_blocking(move || match mode {
            MixMode::PerParagraph => {
                let mut buffers = Vec::with_capacity(processed.len());
                for mut paragraph in processed {
                    let index = paragraph.unit.index();
                    buffers.push(paragraph.unit.take_mixed().ok_or_else(|| {
                        PipelineError::Render {
                            index: Some(index),
                            message: "missing mixed buffer".to_string(),
                        }
                    })?);
                }
                let track = sequencer
                    .concat(conform_units(buffers)?)
                    .map_err(|e| render_error(None, e))?;
                Ok(track.buffer)
            }
            MixMode::Timeline => {
                let mut narrations = Vec::with_capacity(processed.len());
                let mut backgrounds = Vec::with_capacity(processed.len());
                for mut paragraph in processed {
                    let index = paragraph.unit.index();
                    let (Some(narration), Some(background)) =
                        (paragraph.unit.take_narration(), paragraph.background)
                    else {
                        return Err(PipelineError::Render {
                            index: Some(index),
                            message: "missing narration or background".to_string(),
                        });
                    };
                    narrations.push(narration);
                    backgrounds.push(background);
                }

                let track = sequencer
                    .concat(conform_units(narrations)?)
                    .map_err(|e| render_error(None, e))?;
                let rate = track.buffer.sample_rate();
                let channels = track.buffer.channels();
                let backgrounds: Vec<PcmBuffer> = backgrounds
                    .into_iter()
                    .enumerate()
                    .map(|(index, b)| {
                        conform_to(b, rate, channels).map_err(|e| render_error(Some(index), e))
                    })
                    .collect::<Result<_, _>>()?;

                // 每个区域覆盖段落及其后的静音，直到下一段开始
                let regions: Vec<BackgroundRegion<'_>> = track
                    .spans
                    .iter()
                    .enumerate()
                    .map(|(i, span)| BackgroundRegion {
                        start_frame: span.start_frame,
                        end_frame: track
                            .spans
                            .get(i + 1)
                            .map(|next| next.start_frame)
                            .unwrap_or_else(|| span.end_frame()),
                        background: &backgrounds[i],
                    })
                    .collect();

                mixer
                    .mix_regions(&track.buffer, &regions)
                    .map_err(|e| render_error(None, e))
            }
        })
        .await
        .map_err(|e| join_error(None, e))?
    }

    async fn encode(&self, track: PcmBuffer, format: AudioFormat) -> Result<Vec<u8>, PipelineError> {
        if !self.codec.supports_format(format) {
            return Err(PipelineError::Render {
                index: None,
                message: format!("unsupported output format: {}", format),
            });
        }

        let codec = self.codec.clone();
        let config = EncodeConfig {
            format,
            bitrate: self.config.opus_bitrate,
        };
        tokio::task::spawn_blocking(move || codec.encode(&track, &config))
            .await
            .map_err(|e| join_error(None, e))?
            .map_err(|e| PipelineError::Render {
                index: None,
                message: e.to_string(),
            })
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn join_error(index: Option<usize>, err: tokio::task::JoinError) -> PipelineError {
    PipelineError::Render {
        index,
        message: format!("blocking task failed: {}", err),
    }
}

fn render_error(index: Option<usize>, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Render {
        index,
        message: err.to_string(),
    }
}

/// 统一为首段的格式；不一致的段落显式转换并记录
fn conform_units(buffers: Vec<PcmBuffer>) -> Result<Vec<PcmBuffer>, PipelineError> {
    let Some(first) = buffers.first() else {
        return Ok(buffers);
    };
    let rate = first.sample_rate();
    let channels = first.channels();

    buffers
        .into_iter()
        .enumerate()
        .map(|(index, buffer)| {
            if buffer.sample_rate() != rate || buffer.channels() != channels {
                tracing::warn!(
                    paragraph = index,
                    from = %buffer.format_label(),
                    to_rate = rate,
                    to_channels = channels,
                    "Narration format differs from first paragraph, converting"
                );
                conform_to(buffer, rate, channels).map_err(|e| render_error(Some(index), e))
            } else {
                Ok(buffer)
            }
        })
        .collect()
}
