//! 目录规格
//!
//! 目录规格是有序的条目列表，决定片段在成书中的先后顺序。
//! 单个条目匹配文件名，分组条目匹配目录名并展开为目录下的全部章节。
//!
//! 规格可以写在 TOML 文件中：
//!
//! ```toml
//! [[entry]]
//! keyword = "Introduction"
//!
//! [[entry]]
//! keyword = "Part One"
//! kind = "chapters"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::BuildError;

/// 源目录下默认查找的规格文件名
pub const TOC_FILE_NAME: &str = "toc.toml";

/// 内置的成书顺序
const BUILTIN_ORDER: &[(&str, Option<&str>)] = &[
    ("Dedication", None),
    ("Acknowledgment", None),
    ("Foreword", None),
    ("A Thought Leader", None),
    ("Introduction", None),
    ("What makes an AI system an Agent", None),
    ("Part One", Some("chapters")),
    ("Part Two", Some("chapters")),
    ("Part Three", Some("chapters")),
    ("Part Four", Some("chapters")),
    ("Appendix", Some("chapters")),
    ("Conclusion", None),
    ("Glossary", None),
    ("Index of Terms", None),
    (
        "Online Contribution - Frequently Asked Questions- Agentic Design Patterns",
        None,
    ),
];

/// 分组条目的展开方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// 目录下直接包含的 `.docx` 文件，按自然顺序排列
    Chapters,
    /// 未知的展开方式，解析时会产生警告并跳过
    Other(String),
}

impl GroupKind {
    pub fn parse(kind: &str) -> Self {
        if kind.trim().eq_ignore_ascii_case("chapters") {
            GroupKind::Chapters
        } else {
            GroupKind::Other(kind.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupKind::Chapters => "chapters",
            GroupKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目录条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocEntry {
    /// 匹配文件名包含关键字的单个片段
    Single { keyword: String },
    /// 匹配目录名包含关键字的目录，并按 `kind` 展开
    Group { keyword: String, kind: GroupKind },
}

impl TocEntry {
    pub fn single(keyword: impl Into<String>) -> Self {
        TocEntry::Single {
            keyword: keyword.into(),
        }
    }

    pub fn chapters(keyword: impl Into<String>) -> Self {
        TocEntry::Group {
            keyword: keyword.into(),
            kind: GroupKind::Chapters,
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            TocEntry::Single { keyword } | TocEntry::Group { keyword, .. } => keyword,
        }
    }
}

/// TOML 文件中的条目形式
#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawEntry {
    keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawTocFile {
    #[serde(default)]
    entry: Vec<RawEntry>,
}

impl From<RawEntry> for TocEntry {
    fn from(raw: RawEntry) -> Self {
        match raw.kind {
            Some(kind) => TocEntry::Group {
                keyword: raw.keyword,
                kind: GroupKind::parse(&kind),
            },
            None => TocEntry::Single {
                keyword: raw.keyword,
            },
        }
    }
}

impl From<&TocEntry> for RawEntry {
    fn from(entry: &TocEntry) -> Self {
        match entry {
            TocEntry::Single { keyword } => RawEntry {
                keyword: keyword.clone(),
                kind: None,
            },
            TocEntry::Group { keyword, kind } => RawEntry {
                keyword: keyword.clone(),
                kind: Some(kind.as_str().to_string()),
            },
        }
    }
}

/// 有序的目录规格
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TocSpec {
    pub entries: Vec<TocEntry>,
}

impl TocSpec {
    pub fn new(entries: Vec<TocEntry>) -> Self {
        Self { entries }
    }

    /// 内置的默认规格
    pub fn builtin() -> Self {
        let entries = BUILTIN_ORDER
            .iter()
            .map(|(keyword, kind)| match kind {
                Some(kind) => TocEntry::Group {
                    keyword: keyword.to_string(),
                    kind: GroupKind::parse(kind),
                },
                None => TocEntry::single(*keyword),
            })
            .collect();
        Self { entries }
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, BuildError> {
        let raw: RawTocFile =
            toml::from_str(content).map_err(|e| BuildError::TocSpec(e.to_string()))?;
        let entries: Vec<TocEntry> = raw.entry.into_iter().map(TocEntry::from).collect();

        if let Some(blank) = entries.iter().position(|e| e.keyword().trim().is_empty()) {
            return Err(BuildError::TocSpec(format!(
                "entry #{} has an empty keyword",
                blank + 1
            )));
        }

        Ok(Self { entries })
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, BuildError> {
        let raw = RawTocFile {
            entry: self.entries.iter().map(RawEntry::from).collect(),
        };
        toml::to_string_pretty(&raw).map_err(|e| BuildError::TocSpec(e.to_string()))
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 确定本次构建使用的规格
    ///
    /// 优先使用显式指定的文件，其次是源目录下的 `toc.toml`，最后退回内置规格。
    pub fn discover(src_root: &Path, explicit: Option<&Path>) -> Result<Self, BuildError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(BuildError::MissingInput(path.to_path_buf()));
            }
            tracing::info!("使用目录规格文件: {}", path.display());
            return Self::load(path);
        }

        let candidate: PathBuf = src_root.join(TOC_FILE_NAME);
        if candidate.is_file() {
            tracing::info!("使用目录规格文件: {}", candidate.display());
            return Self::load(&candidate);
        }

        tracing::debug!("未找到目录规格文件，使用内置顺序");
        Ok(Self::builtin())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
