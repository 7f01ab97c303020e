//! 翻译模块
//!
//! 把合并后的英文 HTML 翻译为目标语言（默认韩语），采用分层的模块结构：
//! - **core**: 翻译服务和服务提供方
//! - **pipeline**: 文本处理管道（收集、分类、批次）
//! - **storage**: 翻译记忆
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use bookbinder::translation::{ConfigManager, TranslationService, TranslationMemory};
//! use bookbinder::parsers::html::dom::html_to_dom;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::new()?.into_config();
//! let mut service = TranslationService::from_config(config)?;
//! let mut tm = TranslationMemory::new();
//!
//! let dom = html_to_dom(b"<p>The agent plans.</p>", "utf-8")?;
//! let report = service.translate_dom(&dom, &mut tm)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块 - 服务提供方、批次模式和阈值
pub mod config;

/// 核心翻译模块 - 翻译服务与服务提供方实现
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 文本处理管道模块 - 文本收集、分类和批次处理
pub mod pipeline;

/// 译文写回
pub mod processor;

/// 服务提供方使用的提示词
pub mod prompts;

/// 翻译记忆
pub mod storage;

// ============================================================================
// 核心API导出
// ============================================================================

pub use core::{
    create_translator, translate_html_file, TranslationReport, TranslationService, Translator,
};

pub use config::{
    constants, load_dotenv, BatchMode, ConfigManager, MisalignmentPolicy, ProviderKind,
    TranslationConfig,
};

pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

pub use pipeline::{
    Batch, BatchManager, HeuristicClassifier, NodeContext, SkipReason, TextClassifier,
    TextCollector, TextItem,
};

pub use storage::TranslationMemory;

// ============================================================================
// 便利函数
// ============================================================================

/// 检查文本在默认上下文中是否会被送去翻译
///
/// # Examples
///
/// ```rust
/// use bookbinder::translation::should_translate;
///
/// assert!(should_translate("The agent plans its next action."));
/// assert!(!should_translate("import numpy as np"));
/// assert!(!should_translate("   "));
/// ```
pub fn should_translate(text: &str) -> bool {
    HeuristicClassifier::default()
        .skip_reason(text, &NodeContext::default())
        .is_none()
}

/// 检查翻译配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}
