//! 翻译管道模块
//!
//! 提供文本处理管道，包括收集、过滤和批次处理

pub mod batch;
pub mod collector;
pub mod filters;

// 重新导出主要类型
pub use batch::{split_response, Batch, BatchManager, BatchManagerConfig, BatchStats};
pub use collector::{CollectionStats, NodeContext, TextCollector, TextItem};
pub use filters::{
    is_code_like, matched_code_pattern, FilterStats, HeuristicClassifier, SkipReason,
    TextAnalysis, TextClassifier,
};
