//! Paragraph Context - Entities

use crate::domain::audio::{BackgroundTrack, PcmBuffer};
use crate::domain::mood::MoodMetadata;

/// 段落单元 - 旁白与背景音乐的最小处理单位
///
/// 不变量:
/// - index 在一个任务内唯一且与原文顺序一致
/// - raw_text 不可为空
///
/// 由分割器创建，随后续阶段逐步填充，拼接完成后即被丢弃，生命周期仅限单个任务
#[derive(Debug, Clone)]
pub struct ParagraphUnit {
    index: usize,
    raw_text: String,
    mood: Option<MoodMetadata>,
    narration: Option<PcmBuffer>,
    background: Option<BackgroundTrack>,
    mixed: Option<PcmBuffer>,
}

impl ParagraphUnit {
    pub fn new(index: usize, raw_text: impl Into<String>) -> Result<Self, &'static str> {
        let raw_text = raw_text.into();
        if raw_text.trim().is_empty() {
            return Err("段落内容不能为空");
        }
        Ok(Self {
            index,
            raw_text,
            mood: None,
            narration: None,
            background: None,
            mixed: None,
        })
    }

    /// 从分割结果批量创建，index 按原文顺序从 0 开始
    pub fn from_paragraphs(paragraphs: Vec<String>) -> Vec<Self> {
        paragraphs
            .into_iter()
            .enumerate()
            .filter_map(|(index, text)| Self::new(index, text).ok())
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn mood(&self) -> Option<&MoodMetadata> {
        self.mood.as_ref()
    }

    pub fn narration(&self) -> Option<&PcmBuffer> {
        self.narration.as_ref()
    }

    pub fn background(&self) -> Option<&BackgroundTrack> {
        self.background.as_ref()
    }

    pub fn mixed(&self) -> Option<&PcmBuffer> {
        self.mixed.as_ref()
    }

    pub fn set_mood(&mut self, mood: MoodMetadata) {
        self.mood = Some(mood);
    }

    pub fn set_narration(&mut self, narration: PcmBuffer) {
        self.narration = Some(narration);
    }

    pub fn set_background(&mut self, background: BackgroundTrack) {
        self.background = Some(background);
    }

    /// 写入混音结果并释放旁白缓冲
    pub fn set_mixed(&mut self, mixed: PcmBuffer) {
        self.narration = None;
        self.mixed = Some(mixed);
    }

    pub fn take_narration(&mut self) -> Option<PcmBuffer> {
        self.narration.take()
    }

    pub fn take_mixed(&mut self) -> Option<PcmBuffer> {
        self.mixed.take()
    }
}
