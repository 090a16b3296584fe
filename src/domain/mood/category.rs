//! 背景音乐分类与情绪映射
//!
//! 映射规则：情绪字符串转小写后，按固定顺序逐组测试关键字（子串匹配），首个命中即返回。
//! 全部未命中时返回默认分类 `Calm`，不存在"无分类"的结果。

use serde::{Deserialize, Serialize};

use super::random::RandomSource;

/// 背景音乐分类（固定 8 类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicCategory {
    Horror,
    Suspense,
    Happy,
    Calm,
    Historic,
    Romantic,
    Mystery,
    Sad,
}

impl MusicCategory {
    pub const ALL: [MusicCategory; 8] = [
        MusicCategory::Horror,
        MusicCategory::Suspense,
        MusicCategory::Happy,
        MusicCategory::Calm,
        MusicCategory::Historic,
        MusicCategory::Romantic,
        MusicCategory::Mystery,
        MusicCategory::Sad,
    ];

    /// 无关键字命中时的默认分类
    pub const DEFAULT: MusicCategory = MusicCategory::Calm;

    /// 跨分类兜底的优先顺序
    pub const FALLBACK_PRIORITY: [MusicCategory; 8] = [
        MusicCategory::Calm,
        MusicCategory::Happy,
        MusicCategory::Mystery,
        MusicCategory::Suspense,
        MusicCategory::Romantic,
        MusicCategory::Historic,
        MusicCategory::Sad,
        MusicCategory::Horror,
    ];

    /// drama 关键字的两个候选分类
    pub const DRAMA_CHOICES: [MusicCategory; 2] = [MusicCategory::Suspense, MusicCategory::Sad];

    /// 素材库中的目录名
    pub fn as_str(&self) -> &'static str {
        match self {
            MusicCategory::Horror => "Horror",
            MusicCategory::Suspense => "Suspense",
            MusicCategory::Happy => "Happy",
            MusicCategory::Calm => "Calm",
            MusicCategory::Historic => "Historic",
            MusicCategory::Romantic => "Romantic",
            MusicCategory::Mystery => "Mystery",
            MusicCategory::Sad => "Sad",
        }
    }
}

impl std::fmt::Display for MusicCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 关键字命中后的分类规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRule {
    Fixed(MusicCategory),
    /// 在 `MusicCategory::DRAMA_CHOICES` 中随机选择
    Drama,
}

/// 有序关键字组，组间顺序即优先级
pub const KEYWORD_GROUPS: &[&[(&str, CategoryRule)]] = &[
    &[
        ("horror", CategoryRule::Fixed(MusicCategory::Horror)),
        ("terror", CategoryRule::Fixed(MusicCategory::Horror)),
        ("scary", CategoryRule::Fixed(MusicCategory::Horror)),
        ("creepy", CategoryRule::Fixed(MusicCategory::Horror)),
    ],
    &[
        ("suspense", CategoryRule::Fixed(MusicCategory::Suspense)),
        ("tension", CategoryRule::Fixed(MusicCategory::Suspense)),
        ("tense", CategoryRule::Fixed(MusicCategory::Suspense)),
        ("thriller", CategoryRule::Fixed(MusicCategory::Suspense)),
        ("drama", CategoryRule::Drama),
    ],
    &[
        ("happy", CategoryRule::Fixed(MusicCategory::Happy)),
        ("joy", CategoryRule::Fixed(MusicCategory::Happy)),
        ("cheerful", CategoryRule::Fixed(MusicCategory::Happy)),
        ("upbeat", CategoryRule::Fixed(MusicCategory::Happy)),
    ],
    &[
        ("calm", CategoryRule::Fixed(MusicCategory::Calm)),
        ("peaceful", CategoryRule::Fixed(MusicCategory::Calm)),
        ("serene", CategoryRule::Fixed(MusicCategory::Calm)),
        ("relax", CategoryRule::Fixed(MusicCategory::Calm)),
    ],
    &[
        ("historic", CategoryRule::Fixed(MusicCategory::Historic)),
        ("history", CategoryRule::Fixed(MusicCategory::Historic)),
        ("medieval", CategoryRule::Fixed(MusicCategory::Historic)),
        ("epic", CategoryRule::Fixed(MusicCategory::Historic)),
    ],
    &[
        ("romantic", CategoryRule::Fixed(MusicCategory::Romantic)),
        ("romance", CategoryRule::Fixed(MusicCategory::Romantic)),
        ("love", CategoryRule::Fixed(MusicCategory::Romantic)),
    ],
    &[
        ("mystery", CategoryRule::Fixed(MusicCategory::Mystery)),
        ("mysterious", CategoryRule::Fixed(MusicCategory::Mystery)),
        ("enigmatic", CategoryRule::Fixed(MusicCategory::Mystery)),
    ],
    &[
        ("sad", CategoryRule::Fixed(MusicCategory::Sad)),
        ("sorrow", CategoryRule::Fixed(MusicCategory::Sad)),
        ("grief", CategoryRule::Fixed(MusicCategory::Sad)),
        ("melanchol", CategoryRule::Fixed(MusicCategory::Sad)),
    ],
];

/// 按关键字规则查找，不涉及随机源
///
/// 关键字只匹配词首（"tense" 命中 "tensely"，不命中 "intense"）
pub fn match_rule(mood: &str) -> Option<CategoryRule> {
    let normalized = mood.to_lowercase();
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    KEYWORD_GROUPS
        .iter()
        .flat_map(|group| group.iter())
        .find(|(keyword, _)| words.iter().any(|w| w.starts_with(keyword)))
        .map(|(_, rule)| *rule)
}

/// 情绪字符串 → 音乐分类
///
/// 除 drama 关键字外为纯函数；drama 通过注入的随机源在两个分类间选择。
pub fn map_mood_to_category(mood: &str, random: &dyn RandomSource) -> MusicCategory {
    match match_rule(mood) {
        Some(CategoryRule::Fixed(category)) => category,
        Some(CategoryRule::Drama) => {
            let choices = MusicCategory::DRAMA_CHOICES;
            choices[random.pick(choices.len())]
        }
        None => MusicCategory::DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mood::FixedRandomSource;

    #[test]
    fn test_basic_mapping() {
        let rng = FixedRandomSource(0);
        assert_eq!(map_mood_to_category("happy", &rng), MusicCategory::Happy);
        assert_eq!(map_mood_to_category("Sad", &rng), MusicCategory::Sad);
        assert_eq!(map_mood_to_category("A Creepy night", &rng), MusicCategory::Horror);
        assert_eq!(map_mood_to_category("lovestruck", &rng), MusicCategory::Romantic);
    }

    #[test]
    fn test_first_group_wins() {
        let rng = FixedRandomSource(0);
        // horror 组优先于 sad 组
        assert_eq!(map_mood_to_category("sad horror", &rng), MusicCategory::Horror);
        // tension 先于 drama 命中
        assert_eq!(map_mood_to_category("dramatic tension", &rng), MusicCategory::Suspense);
    }

    #[test]
    fn test_keywords_match_word_starts_only() {
        let rng = FixedRandomSource(0);
        assert_eq!(map_mood_to_category("intense joy", &rng), MusicCategory::Happy);
        assert_eq!(map_mood_to_category("tense", &rng), MusicCategory::Suspense);
        assert_eq!(map_mood_to_category("rising tension", &rng), MusicCategory::Suspense);
        assert_eq!(map_mood_to_category("tensely-quiet", &rng), MusicCategory::Suspense);
        assert_eq!(map_mood_to_category("melancholic", &rng), MusicCategory::Sad);
        assert_eq!(map_mood_to_category("relaxing, warm", &rng), MusicCategory::Calm);
    }

    #[test]
    fn test_no_match_uses_default() {
        let rng = FixedRandomSource(0);
        assert_eq!(
            map_mood_to_category("quietly triumphant yet ambiguous", &rng),
            MusicCategory::DEFAULT
        );
        assert_eq!(map_mood_to_category("", &rng), MusicCategory::Calm);
    }

    #[test]
    fn test_drama_uses_injected_source() {
        assert_eq!(
            map_mood_to_category("drama", &FixedRandomSource(0)),
            MusicCategory::Suspense
        );
        assert_eq!(map_mood_to_category("Drama", &FixedRandomSource(1)), MusicCategory::Sad);
    }

    #[test]
    fn test_mapping_is_deterministic_without_drama() {
        let rng = FixedRandomSource(1);
        for mood in ["happy", "calm", "mystery", "epic battle", "nothing here"] {
            let first = map_mood_to_category(mood, &rng);
            let second = map_mood_to_category(mood, &FixedRandomSource(0));
            assert_eq!(first, second, "mood {mood}");
        }
    }

    #[test]
    fn test_category_names() {
        assert_eq!(MusicCategory::Happy.to_string(), "Happy");
        assert_eq!(MusicCategory::FALLBACK_PRIORITY.len(), MusicCategory::ALL.len());
    }
}
