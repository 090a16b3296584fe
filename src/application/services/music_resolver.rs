//! Music Resolver - 情绪 → 背景素材
//!
//! 解析顺序由 `resolution_plan` 生成的有序候选列表决定：
//! 1. 目标分类：计算索引 → 索引 1 → 其余索引，每个索引依次尝试两种文件名大小写约定
//! 2. 其他分类：按 `MusicCategory::FALLBACK_PRIORITY`，索引 1 优先
//! 3. 全部落空时返回内置兜底素材
//!
//! 存在性查询全部经过 `AssetExistenceCache`，解析本身永不失败。

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::application::error::PipelineError;
use crate::application::ports::{AssetStoreError, AssetStorePort};
use crate::domain::mood::MAX_ASSET_INDEX;
use crate::domain::{
    map_mood_to_category, BackgroundTrack, MoodMetadata, MusicCategory, RandomSource, Resolution,
};

/// 素材文件名大小写约定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameConvention {
    /// `Happy/Happy_3.mp3`
    Title,
    /// `Happy/happy_3.mp3`
    Lower,
}

impl FilenameConvention {
    pub const ORDER: [FilenameConvention; 2] = [FilenameConvention::Title, FilenameConvention::Lower];

    pub fn file_name(&self, category: MusicCategory, index: u8, extension: &str) -> String {
        match self {
            FilenameConvention::Title => format!("{}_{}.{}", category.as_str(), index, extension),
            FilenameConvention::Lower => format!(
                "{}_{}.{}",
                category.as_str().to_lowercase(),
                index,
                extension
            ),
        }
    }
}

/// 一个候选解析键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateKey {
    pub category: MusicCategory,
    pub index: u8,
    pub convention: FilenameConvention,
    pub resolution: Resolution,
}

impl CandidateKey {
    pub fn file_name(&self, extension: &str) -> String {
        self.convention.file_name(self.category, self.index, extension)
    }

    /// 素材库中的相对路径：`{Category}/{文件名}`
    pub fn path(&self, extension: &str) -> String {
        format!("{}/{}", self.category.as_str(), self.file_name(extension))
    }
}

/// 生成完整的有序候选列表
pub fn resolution_plan(category: MusicCategory, index: u8) -> Vec<CandidateKey> {
    let index = index.clamp(1, MAX_ASSET_INDEX);
    let mut plan = Vec::with_capacity(MusicCategory::ALL.len() * MAX_ASSET_INDEX as usize * 2);

    let mut primary_indices = vec![index];
    if index != 1 {
        primary_indices.push(1);
    }
    primary_indices.extend((2..=MAX_ASSET_INDEX).filter(|i| *i != index));

    for (pos, idx) in primary_indices.into_iter().enumerate() {
        let resolution = if pos == 0 {
            Resolution::Exact
        } else {
            Resolution::IndexFallback
        };
        for convention in FilenameConvention::ORDER {
            plan.push(CandidateKey {
                category,
                index: idx,
                convention,
                resolution,
            });
        }
    }

    for other in MusicCategory::FALLBACK_PRIORITY
        .iter()
        .copied()
        .filter(|c| *c != category)
    {
        for idx in 1..=MAX_ASSET_INDEX {
            for convention in FilenameConvention::ORDER {
                plan.push(CandidateKey {
                    category: other,
                    index: idx,
                    convention,
                    resolution: Resolution::CategoryFallback,
                });
            }
        }
    }

    plan
}

/// 素材存在性的读穿缓存
///
/// 按分类缓存目录清单，任意路径的存在性单独缓存；未命中时查询素材库，
/// 通过 `entry().or_insert` 原子写入，并发读取无需加锁。
pub struct AssetExistenceCache {
    store: Arc<dyn AssetStorePort>,
    listings: DashMap<String, Arc<HashSet<String>>>,
    paths: DashMap<String, bool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// 缓存命中统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistenceCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub cached_categories: usize,
    pub cached_paths: usize,
}

impl AssetExistenceCache {
    pub fn new(store: Arc<dyn AssetStorePort>) -> Self {
        Self {
            store,
            listings: DashMap::new(),
            paths: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// 分类目录下的文件名集合
    pub async fn listing(&self, category: &str) -> Arc<HashSet<String>> {
        if let Some(entry) = self.listings.get(category) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.value().clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let names = match self.store.list_assets_in_category(category).await {
            Ok(names) => names,
            Err(AssetStoreError::NotFound(_)) => Vec::new(),
            Err(e) => {
                // 清单不可用时不缓存，下次重新查询
                tracing::warn!(category, error = %e, "Failed to list asset category");
                return Arc::new(HashSet::new());
            }
        };

        self.listings
            .entry(category.to_string())
            .or_insert_with(|| Arc::new(names.into_iter().collect()))
            .value()
            .clone()
    }

    /// 任意路径的存在性
    pub async fn exists(&self, path: &str) -> bool {
        if let Some(entry) = self.paths.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return *entry.value();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let found = self.store.exists(path).await;
        *self.paths.entry(path.to_string()).or_insert(found).value()
    }

    pub fn stats(&self) -> ExistenceCacheStats {
        ExistenceCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cached_categories: self.listings.len(),
            cached_paths: self.paths.len(),
        }
    }
}

/// Music Resolver 配置
#[derive(Debug, Clone)]
pub struct MusicResolverConfig {
    /// 素材文件扩展名（不含点）
    pub extension: String,
    /// 内置兜底素材在素材库中的相对路径
    pub last_resort_path: String,
}

impl Default for MusicResolverConfig {
    fn default() -> Self {
        Self {
            extension: "mp3".to_string(),
            last_resort_path: "fallback.mp3".to_string(),
        }
    }
}

/// Music Resolver
pub struct MusicResolver {
    store: Arc<dyn AssetStorePort>,
    cache: Arc<AssetExistenceCache>,
    random: Arc<dyn RandomSource>,
    config: MusicResolverConfig,
}

impl MusicResolver {
    pub fn new(
        store: Arc<dyn AssetStorePort>,
        random: Arc<dyn RandomSource>,
        config: MusicResolverConfig,
    ) -> Self {
        let cache = Arc::new(AssetExistenceCache::new(store.clone()));
        Self {
            store,
            cache,
            random,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<AssetExistenceCache> {
        &self.cache
    }

    /// 启动时校验兜底素材
    ///
    /// 兜底素材缺失属于配置错误
    pub async fn verify_last_resort(&self) -> Result<(), PipelineError> {
        if self.cache.exists(&self.config.last_resort_path).await {
            tracing::info!(path = %self.config.last_resort_path, "Last-resort asset verified");
            Ok(())
        } else {
            Err(PipelineError::AssetResolution {
                index: None,
                message: format!(
                    "last-resort asset missing: {}",
                    self.config.last_resort_path
                ),
            })
        }
    }

    /// 解析背景素材，永不失败
    pub async fn resolve(&self, mood: &MoodMetadata) -> BackgroundTrack {
        let category = map_mood_to_category(&mood.mood, self.random.as_ref());
        let index = mood.intensity.asset_index();

        for candidate in resolution_plan(category, index) {
            let listing = self.cache.listing(candidate.category.as_str()).await;
            if listing.is_empty() {
                continue;
            }
            let file_name = candidate.file_name(&self.config.extension);
            if !listing.contains(&file_name) {
                continue;
            }

            let path = candidate.path(&self.config.extension);
            if candidate.resolution != Resolution::Exact {
                tracing::debug!(
                    mood = %mood.mood,
                    wanted_category = %category,
                    wanted_index = index,
                    category = %candidate.category,
                    index = candidate.index,
                    resolution = ?candidate.resolution,
                    "Background resolved via fallback"
                );
            }
            return BackgroundTrack {
                category: candidate.category,
                index: candidate.index,
                asset_ref: self.store.resolve_url(&path),
                asset_path: path,
                duration_secs: 0.0,
                resolution: candidate.resolution,
            };
        }

        tracing::warn!(
            mood = %mood.mood,
            category = %category,
            index,
            path = %self.config.last_resort_path,
            "No background asset in any category, using last resort"
        );
        self.last_resort()
    }

    /// 内置兜底素材
    pub fn last_resort(&self) -> BackgroundTrack {
        BackgroundTrack {
            category: MusicCategory::DEFAULT,
            index: 1,
            asset_ref: self.store.resolve_url(&self.config.last_resort_path),
            asset_path: self.config.last_resort_path.clone(),
            duration_secs: 0.0,
            resolution: Resolution::LastResort,
        }
    }
}
