//! # DOCX 模块
//!
//! - `package` - zip 包读写
//! - `xml` - WordprocessingML 部件的事件流与元素树
//! - `builder` - 从零生成文档（封面、测试用的章节）
//! - `merge` - 按顺序合并多个文档
//! - `convert` - 转换为 HTML

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod builder;
pub mod convert;
pub mod merge;
pub mod package;
pub mod xml;

pub use builder::{write_cover, DocxBuilder};
pub use convert::{ConvertStats, DocxConverter, StyleMap, MEDIA_DIR_NAME};
pub use merge::{compose, merge_in_order, ComposeStats, CoverText, MergeOutcome, AUTO_COVER_NAME};
pub use package::DocxPackage;

/// DOCX 处理错误
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("无法读写 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法读写 zip 包 {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("XML 错误 ({part}): {message}")]
    Xml { part: String, message: String },

    #[error("{} 缺少部件 {part}", .package.display())]
    MissingPart { package: PathBuf, part: String },

    #[error("没有可合并的文档")]
    NothingToCompose,
}

pub type DocxResult<T> = Result<T, DocxError>;

impl DocxError {
    pub(crate) fn xml(part: &str, message: impl ToString) -> Self {
        DocxError::Xml {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}
