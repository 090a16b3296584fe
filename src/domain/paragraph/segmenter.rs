//! 段落分割器
//!
//! 约定：上游文本预处理阶段会在每个段落末尾嵌入一个保留分隔符（默认 `$`）。
//! 分隔符是唯一的主切分规则；空行切分只是兜底启发式，仅在以下条件同时满足时启用：
//! - 按分隔符切分后得到 ≤1 个段落
//! - 输入长度超过 `fallback_min_chars`

use super::errors::SegmentError;

/// 默认段落分隔符
pub const DEFAULT_DELIMITER: char = '$';

/// 默认启用空行兜底的最小字符数
pub const DEFAULT_FALLBACK_MIN_CHARS: usize = 200;

/// 默认最大段落数
pub const DEFAULT_MAX_UNITS: usize = 200;

/// 段落分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 保留分隔符
    pub delimiter: char,
    /// 超过该字符数且分隔符切分不足时，才使用空行兜底
    pub fallback_min_chars: usize,
    /// 段落数上限，超出部分会被丢弃并输出诊断日志
    pub max_units: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            fallback_min_chars: DEFAULT_FALLBACK_MIN_CHARS,
            max_units: DEFAULT_MAX_UNITS,
        }
    }
}

/// 切分策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// 按保留分隔符
    Delimiter,
    /// 空行兜底
    BlankLine,
}

/// 分割结果
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// 有序、非空的段落文本
    pub paragraphs: Vec<String>,
    /// 实际使用的切分策略
    pub strategy: SplitStrategy,
    /// 因超出上限被丢弃的段落数
    pub dropped_units: usize,
    /// 因超出上限被丢弃的字符数
    pub dropped_chars: usize,
}

impl Segmentation {
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.dropped_units > 0
    }
}

/// 按分隔符切分，去除首尾空白并过滤空段
fn split_by_delimiter(text: &str, delimiter: char) -> Vec<String> {
    text.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按空行切分（支持 \n 与 \r\n）
///
/// 段落内部的换行保留为单个 `\n`
fn split_by_blank_lines(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// 对文本进行段落切分
///
/// 切分流程：
/// 1. 去除首尾空白，空输入返回 `SegmentError::EmptyInput`
/// 2. 按保留分隔符切分
/// 3. 若结果 ≤1 段且输入超过最小长度，改用空行切分（结果更多时才采用）
/// 4. 超过 `max_units` 的段落被丢弃，并记录 warn 诊断
pub fn segment_text(text: &str, config: &SegmentConfig) -> Result<Segmentation, SegmentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SegmentError::EmptyInput);
    }
    if config.max_units == 0 {
        return Err(SegmentError::InvalidConfig(
            "max_units must be greater than 0".to_string(),
        ));
    }

    let mut paragraphs = split_by_delimiter(trimmed, config.delimiter);
    let mut strategy = SplitStrategy::Delimiter;

    if paragraphs.len() <= 1 && trimmed.chars().count() > config.fallback_min_chars {
        // 兜底时分隔符已无意义，先剔除再按空行切分
        let stripped: String = trimmed.chars().filter(|&c| c != config.delimiter).collect();
        let fallback = split_by_blank_lines(&stripped);
        if fallback.len() > paragraphs.len() {
            tracing::debug!(
                paragraphs = fallback.len(),
                "Delimiter split yielded a single unit, using blank-line fallback"
            );
            paragraphs = fallback;
            strategy = SplitStrategy::BlankLine;
        }
    }

    if paragraphs.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let mut dropped_units = 0;
    let mut dropped_chars = 0;
    if paragraphs.len() > config.max_units {
        let dropped = paragraphs.split_off(config.max_units);
        dropped_units = dropped.len();
        dropped_chars = dropped.iter().map(|p| p.chars().count()).sum();
        tracing::warn!(
            max_units = config.max_units,
            dropped_units = dropped_units,
            dropped_chars = dropped_chars,
            "Paragraph cap reached, trailing text dropped"
        );
    }

    Ok(Segmentation {
        paragraphs,
        strategy,
        dropped_units,
        dropped_chars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_split() {
        let seg = segment_text("Once upon a time.$They lived happily.$", &SegmentConfig::default())
            .unwrap();
        assert_eq!(seg.paragraphs, vec!["Once upon a time.", "They lived happily."]);
        assert_eq!(seg.strategy, SplitStrategy::Delimiter);
        assert!(!seg.is_truncated());
    }

    #[test]
    fn test_empty_input_is_error() {
        let config = SegmentConfig::default();
        assert!(matches!(segment_text("", &config), Err(SegmentError::EmptyInput)));
        assert!(matches!(segment_text("   \n\t", &config), Err(SegmentError::EmptyInput)));
        assert!(matches!(segment_text(" $ $$ ", &config), Err(SegmentError::EmptyInput)));
    }

    #[test]
    fn test_short_text_without_delimiter_stays_single_unit() {
        let config = SegmentConfig::default();
        let seg = segment_text("First line.\n\nSecond line.", &config).unwrap();
        // 未超过兜底阈值，不做空行切分
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.strategy, SplitStrategy::Delimiter);
    }

    #[test]
    fn test_blank_line_fallback_for_long_text() {
        let config = SegmentConfig {
            fallback_min_chars: 20,
            ..Default::default()
        };
        let text = "The first paragraph runs on.\r\n\r\nThe second one\ncontinues here.\n\n\n";
        let seg = segment_text(text, &config).unwrap();
        assert_eq!(seg.strategy, SplitStrategy::BlankLine);
        assert_eq!(
            seg.paragraphs,
            vec!["The first paragraph runs on.", "The second one\ncontinues here."]
        );
    }

    #[test]
    fn test_fallback_not_used_when_delimiters_present() {
        let config = SegmentConfig {
            fallback_min_chars: 5,
            ..Default::default()
        };
        let seg = segment_text("One.\n\nStill one.$Two.", &config).unwrap();
        assert_eq!(seg.strategy, SplitStrategy::Delimiter);
        assert_eq!(seg.len(), 2);
    }

    #[test]
    fn test_cap_drops_with_counts() {
        let config = SegmentConfig {
            max_units: 2,
            ..Default::default()
        };
        let seg = segment_text("a$bb$ccc$dddd", &config).unwrap();
        assert_eq!(seg.paragraphs, vec!["a", "bb"]);
        assert_eq!(seg.dropped_units, 2);
        assert_eq!(seg.dropped_chars, 7);
        assert!(seg.is_truncated());
    }

    #[test]
    fn test_nothing_dropped_below_cap() {
        let config = SegmentConfig::default();
        let text: Vec<String> = (0..50).map(|i| format!("Paragraph {}.", i)).collect();
        let seg = segment_text(&text.join("$"), &config).unwrap();
        assert_eq!(seg.len(), 50);
        assert_eq!(seg.dropped_units, 0);
        assert_eq!(seg.paragraphs.join(""), text.join(""));
    }

    #[test]
    fn test_custom_delimiter() {
        let config = SegmentConfig {
            delimiter: '¶',
            ..Default::default()
        };
        let seg = segment_text("甲段落。¶乙段落。", &config).unwrap();
        assert_eq!(seg.paragraphs, vec!["甲段落。", "乙段落。"]);
    }
}
