//! 翻译系统核心模块
//!
//! - **服务层** (`service.rs`): 协调收集、缓存、批次和写回
//! - **引擎层** (`engine.rs`): 服务提供方接口和 HTTP 实现
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── TextCollector (pipeline/collector.rs)
//!     ├── BatchManager (pipeline/batch.rs)
//!     ├── TranslationMemory (storage/cache.rs)
//!     ├── apply_replacements (processor.rs)
//!     └── Translator (engine.rs)
//! ```

pub mod engine;
pub mod service;

pub use engine::{create_translator, AnthropicTranslator, OpenAiTranslator, Translator};
pub use service::{translate_html_file, TranslationReport, TranslationService};
