//! Mood Context - Value Objects

use serde::{Deserialize, Serialize};

/// 背景音乐素材索引上限（素材按 1..=7 编号）
pub const MAX_ASSET_INDEX: u8 = 7;

/// 情绪强度，始终位于 [1,10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// 创建强度值，超出范围时截断到 [1,10]
    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// 将强度 [1,10] 线性映射到素材索引 [1,7]，向上取整
    ///
    /// ceil(intensity / 10 × 7)，整数运算避免浮点误差
    pub fn asset_index(&self) -> u8 {
        let scaled = (self.0 as u32 * MAX_ASSET_INDEX as u32 + 9) / 10;
        (scaled as u8).clamp(1, MAX_ASSET_INDEX)
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(5)
    }
}

impl From<i64> for Intensity {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Intensity> for u8 {
    fn from(value: Intensity) -> Self {
        value.0
    }
}

/// 旁白语速
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tempo {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Tempo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tempo::Slow => "slow",
            Tempo::Medium => "medium",
            Tempo::Fast => "fast",
        }
    }

    /// 宽松解析，未知取值视为 medium
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "slow" => Tempo::Slow,
            "fast" => Tempo::Fast,
            _ => Tempo::Medium,
        }
    }

    /// 传给合成器的语速提示
    pub fn speed_factor(&self) -> f32 {
        match self {
            Tempo::Slow => 0.9,
            Tempo::Medium => 1.0,
            Tempo::Fast => 1.1,
        }
    }
}

impl std::fmt::Display for Tempo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 情绪元数据 - 分类器对单个段落的输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodMetadata {
    pub mood: String,
    pub genre: String,
    pub intensity: Intensity,
    pub tempo: Tempo,
}

impl MoodMetadata {
    pub fn new(
        mood: impl Into<String>,
        genre: impl Into<String>,
        intensity: i64,
        tempo: Tempo,
    ) -> Self {
        Self {
            mood: mood.into(),
            genre: genre.into(),
            intensity: Intensity::new(intensity),
            tempo,
        }
    }

    /// 分类失败时使用的固定默认值
    pub fn fallback() -> Self {
        Self::new("calm", "general", 5, Tempo::Medium)
    }
}

impl Default for MoodMetadata {
    fn default() -> Self {
        Self::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_clamped() {
        assert_eq!(Intensity::new(-3).value(), 1);
        assert_eq!(Intensity::new(0).value(), 1);
        assert_eq!(Intensity::new(7).value(), 7);
        assert_eq!(Intensity::new(42).value(), 10);
    }

    #[test]
    fn test_asset_index_rounds_up() {
        assert_eq!(Intensity::new(3).asset_index(), 3);
        assert_eq!(Intensity::new(8).asset_index(), 6);
        let indices: Vec<u8> = (1..=10).map(|i| Intensity::new(i).asset_index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 3, 4, 5, 5, 6, 7, 7]);
    }

    #[test]
    fn test_intensity_deserialize_clamps() {
        let meta: MoodMetadata = serde_json::from_str(
            r#"{"mood":"happy","genre":"fantasy","intensity":15,"tempo":"fast"}"#,
        )
        .unwrap();
        assert_eq!(meta.intensity.value(), 10);
        assert_eq!(meta.tempo, Tempo::Fast);
    }

    #[test]
    fn test_tempo_lenient() {
        assert_eq!(Tempo::parse_lenient("SLOW"), Tempo::Slow);
        assert_eq!(Tempo::parse_lenient("allegro"), Tempo::Medium);
    }
}
