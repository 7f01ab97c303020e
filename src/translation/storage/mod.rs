//! 存储模块
//!
//! 提供翻译记忆的持久化存储。

pub mod cache;

pub use cache::{CacheStats, TranslationMemory};
