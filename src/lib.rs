//! # Bookbinder Library
//!
//! 把分散的 `.docx` 章节片段按目录规格合并成一本书，转换为 HTML，
//! 在保留代码与结构的前提下机器翻译正文，最后输出分页 PDF。
//!
//! ## 模块组织
//!
//! - `core` - 构建流程、配置与错误类型
//! - `toc` - 目录规格与片段排序
//! - `docx` - 文档包读写、合并与 HTML 转换
//! - `parsers` - HTML DOM 操作与行内样式解析
//! - `builders` - 自动目录与 PDF 渲染
//! - `translation` - 文本分类、批次处理、翻译记忆与服务提供方
//! - `env` - 环境变量
//! - `utils` - URL 与媒体类型工具

pub mod builders;
pub mod core;
pub mod docx;
pub mod env;
pub mod parsers;
pub mod toc;
pub mod translation;
pub mod utils;

// Re-export commonly used items for convenience
pub use self::core::*;
pub use builders::{ChromiumRenderer, PageLayout, Renderer};
pub use toc::{build_order, OrderedFragments, TocSpec};
pub use translation::{TranslationMemory, TranslationService};
