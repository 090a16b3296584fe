//! 应用层测试替身

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::{
    ArtifactStoragePort, AssetStoreError, AssetStorePort, AudioCodecPort, AudioFormat,
    CacheError, CacheMetadata, CacheStats, ClassifierError, CodecError, EncodeConfig,
    MoodClassifierPort, NarrationCachePort, ProgressReporter, StoredArtifact, SynthesisRequest,
    SynthesisResponse, TtsEnginePort, TtsError, UploadError,
};
use crate::domain::{MoodMetadata, PcmBuffer};

const RAW_MAGIC: &[u8; 4] = b"RAW0";

/// 测试用裸 PCM 编码：`RAW0` + 采样率(u32 LE) + 声道数(u16 LE) + f32 LE 样本
pub fn encode_raw(pcm: &PcmBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(10 + pcm.samples().len() * 4);
    out.extend_from_slice(RAW_MAGIC);
    out.extend_from_slice(&pcm.sample_rate().to_le_bytes());
    out.extend_from_slice(&pcm.channels().to_le_bytes());
    for s in pcm.samples() {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// 常量样本的测试音频
pub fn tone(secs: f64, value: f32, sample_rate: u32, channels: u16) -> PcmBuffer {
    let frames = crate::domain::secs_to_frames(secs, sample_rate);
    PcmBuffer::new(vec![value; frames * channels as usize], sample_rate, channels).unwrap()
}

/// 解析 `encode_raw` 格式的编解码器
#[derive(Debug, Default)]
pub struct RawCodec;

impl AudioCodecPort for RawCodec {
    fn decode(&self, data: &[u8], _extension_hint: Option<&str>) -> Result<PcmBuffer, CodecError> {
        if data.len() < 10 || &data[..4] != RAW_MAGIC {
            return Err(CodecError::DecodingError("not raw pcm".to_string()));
        }
        let rate = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let channels = u16::from_le_bytes([data[8], data[9]]);
        let samples = data[10..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        PcmBuffer::new(samples, rate, channels).map_err(|e| CodecError::InvalidInput(e.to_string()))
    }

    fn encode(&self, pcm: &PcmBuffer, _config: &EncodeConfig) -> Result<Vec<u8>, CodecError> {
        Ok(encode_raw(pcm))
    }

    fn supports_format(&self, format: AudioFormat) -> bool {
        format == AudioFormat::Wav
    }
}

/// 内存素材库
#[derive(Clone, Default)]
pub struct MemoryAssetStore {
    files: Arc<DashMap<String, Vec<u8>>>,
    list_calls: Arc<AtomicUsize>,
}

impl MemoryAssetStore {
    /// 以占位内容创建素材
    pub fn new(paths: &[&str]) -> Self {
        let store = Self::default();
        for path in paths {
            store.files.insert(path.to_string(), Vec::new());
        }
        store
    }

    pub fn with_asset(self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), data);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetStorePort for MemoryAssetStore {
    async fn list_assets_in_category(&self, category: &str) -> Result<Vec<String>, AssetStoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let prefix = format!("{}/", category);
        Ok(self
            .files
            .iter()
            .filter_map(|e| e.key().strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("mem://{}", path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetStoreError> {
        self.files
            .get(path)
            .map(|e| e.value().clone())
            .ok_or_else(|| AssetStoreError::NotFound(path.to_string()))
    }
}

/// 根据文本关键字返回情绪的分类器，文本含 `!fail` 时报错
#[derive(Default)]
pub struct ScriptedClassifier {
    moods: Vec<(String, MoodMetadata)>,
}

impl ScriptedClassifier {
    pub fn with(mut self, needle: &str, mood: MoodMetadata) -> Self {
        self.moods.push((needle.to_string(), mood));
        self
    }
}

#[async_trait]
impl MoodClassifierPort for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<MoodMetadata, ClassifierError> {
        if text.contains("!fail") {
            return Err(ClassifierError::ServiceError("classifier down".to_string()));
        }
        Ok(self
            .moods
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, mood)| mood.clone())
            .unwrap_or_else(MoodMetadata::fallback))
    }
}

/// 按文本返回指定时长音频的合成器
///
/// 文本含 `!tts-fail` 时始终失败，含 `!slow` 时延迟返回
pub struct ScriptedTts {
    sample_rate: u32,
    channels: u16,
    durations: Vec<(String, f64)>,
    default_secs: f64,
    calls: AtomicUsize,
    speeds: Mutex<HashMap<usize, f32>>,
}

impl ScriptedTts {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            durations: Vec::new(),
            default_secs: 1.0,
            calls: AtomicUsize::new(0),
            speeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_duration(mut self, needle: &str, secs: f64) -> Self {
        self.durations.push((needle.to_string(), secs));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn speed_for(&self, index: usize) -> Option<f32> {
        self.speeds.lock().unwrap().get(&index).copied()
    }
}

#[async_trait]
impl TtsEnginePort for ScriptedTts {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisResponse, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.speeds
            .lock()
            .unwrap()
            .insert(request.paragraph_index, request.speed);

        if request.text.contains("!tts-fail") {
            return Err(TtsError::ServiceError("503".to_string()));
        }
        if request.text.contains("!slow") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        let secs = self
            .durations
            .iter()
            .find(|(needle, _)| request.text.contains(needle.as_str()))
            .map(|(_, secs)| *secs)
            .unwrap_or(self.default_secs);
        let pcm = tone(secs, 0.5, self.sample_rate, self.channels);
        Ok(SynthesisResponse {
            duration_ms: Some(pcm.duration_ms()),
            sample_rate: Some(self.sample_rate),
            audio_data: encode_raw(&pcm),
        })
    }
}

/// 内存成品存储
#[derive(Clone, Default)]
pub struct MemoryArtifactStorage {
    pub artifacts: Arc<DashMap<String, Vec<u8>>>,
    pub fail: bool,
    /// 写入后、返回前的等待，模拟慢上传
    pub store_delay: Duration,
}

#[async_trait]
impl ArtifactStoragePort for MemoryArtifactStorage {
    async fn store(&self, logical_path: &str, data: Vec<u8>) -> Result<StoredArtifact, UploadError> {
        if self.fail {
            return Err(UploadError::IoError("disk on fire".to_string()));
        }
        let size_bytes = data.len() as u64;
        self.artifacts.insert(logical_path.to_string(), data);
        if !self.store_delay.is_zero() {
            tokio::time::sleep(self.store_delay).await;
        }
        Ok(StoredArtifact {
            path: logical_path.to_string(),
            url: format!("mem://artifacts/{}", logical_path),
            size_bytes,
        })
    }

    async fn delete(&self, logical_path: &str) -> Result<(), UploadError> {
        self.artifacts.remove(logical_path);
        Ok(())
    }
}

/// 内存旁白缓存
#[derive(Default)]
pub struct MemoryNarrationCache {
    pub entries: DashMap<String, Vec<u8>>,
}

#[async_trait]
impl NarrationCachePort for MemoryNarrationCache {
    async fn put(
        &self,
        cache_key: &str,
        audio_data: Vec<u8>,
        _metadata: CacheMetadata,
    ) -> Result<(), CacheError> {
        self.entries.insert(cache_key.to_string(), audio_data);
        Ok(())
    }

    async fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(cache_key).map(|e| e.value().clone()))
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        self.entries.remove(cache_key);
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            ..Default::default()
        }
    }
}

/// 记录进度事件
#[derive(Default)]
pub struct RecordingProgress {
    pub completed: Mutex<Vec<(usize, usize)>>,
    pub total: Mutex<Option<usize>>,
}

impl ProgressReporter for RecordingProgress {
    fn segmented(&self, _job_id: &str, total_paragraphs: usize) {
        *self.total.lock().unwrap() = Some(total_paragraphs);
    }

    fn paragraph_completed(&self, _job_id: &str, index: usize, completed: usize, _total: usize) {
        self.completed.lock().unwrap().push((index, completed));
    }
}
