//! # 解析器模块
//!
//! - `html` - HTML 文档解析、DOM 操作、图片嵌入
//! - `css` - 行内样式中的字体声明

pub mod css;
pub mod html;

// Re-export commonly used items for convenience
pub use css::{declared_font_family, format_font_family};
pub use html::{html_to_dom, inline_images, read_html_file, serialize_document, write_html_file};
