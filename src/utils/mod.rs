//! # 工具模块
//!
//! - `url` - data URL、媒体类型识别、本地路径与 `file://` URL 转换

pub mod url;

// Re-export commonly used items for convenience
pub use url::{
    create_data_url, detect_image_media_type, detect_media_type_by_file_name, file_url,
    is_url_and_has_protocol, resolve_local_src, Url,
};
