//! Asset Adapter - 背景音乐素材库实现

mod file_asset_store;

pub use file_asset_store::FileAssetStore;
