//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod assets;
pub mod classifier;
pub mod codec;
pub mod storage;
pub mod tts;

pub use assets::*;
pub use classifier::*;
pub use codec::*;
pub use storage::*;
pub use tts::*;
