//! Background Track

use serde::{Deserialize, Serialize};

use crate::domain::mood::MusicCategory;

/// 背景素材的解析来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 命中计算出的分类与索引
    Exact,
    /// 同分类的其他索引
    IndexFallback,
    /// 其他分类
    CategoryFallback,
    /// 内置兜底素材
    LastResort,
}

/// 背景音乐
///
/// 不变量: 总是指向一个具体素材（包括内置兜底素材），不存在未解析状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundTrack {
    /// 素材所属分类（兜底素材记为默认分类）
    pub category: MusicCategory,
    /// 素材索引 [1,7]
    pub index: u8,
    /// 素材在素材库中的相对路径
    pub asset_path: String,
    /// 素材可访问 URL
    pub asset_ref: String,
    /// 素材时长（秒），解码后填充
    pub duration_secs: f64,
    pub resolution: Resolution,
}

impl BackgroundTrack {
    pub fn is_last_resort(&self) -> bool {
        self.resolution == Resolution::LastResort
    }
}
