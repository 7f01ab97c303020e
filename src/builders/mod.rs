//! # 构建器模块
//!
//! 在转换后的 HTML 之上生成最终产物：
//!
//! - `toc` - 按标题生成自动目录
//! - `pdf` - 注入 `@page` 样式并用无头 Chromium 输出 PDF

pub mod pdf;
pub mod toc;

// Re-export commonly used items for convenience
pub use pdf::{ChromiumRenderer, PageLayout, RenderError, Renderer};
pub use toc::insert_auto_toc;
