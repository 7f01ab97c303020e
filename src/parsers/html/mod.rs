//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `serializer`: 序列化与文件读写
//! - `assets`: 图片嵌入

pub mod assets;
pub mod dom;
pub mod serializer;

pub use assets::{inline_images, InlineStats};
pub use dom::{
    append_child, append_text, find_nodes, get_body, get_child_node_by_name, get_node_attr,
    get_node_name, html_to_dom, new_element, prepend_child, set_node_attr, text_content,
};
pub use serializer::{read_html_file, serialize_document, write_html_file};
