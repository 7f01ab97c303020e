//! 片段解析
//!
//! 把目录规格映射到源目录中的具体 `.docx` 文件。源目录只扫描一次，
//! 之后所有条目都在内存索引上匹配。

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::BuildError;

use super::natural::natural_key;
use super::spec::{GroupKind, TocEntry, TocSpec};

/// 一个待合并的 `.docx` 片段，以绝对路径标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    path: PathBuf,
}

impl Fragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件名（含扩展名）
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl AsRef<Path> for Fragment {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// 解析过程中产生的警告
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// 没有文件名包含该关键字的片段
    MissingFile { keyword: String },
    /// 没有目录名包含该关键字的目录
    MissingDirectory { keyword: String },
    /// 目录存在但其中没有片段
    EmptyDirectory { dir: PathBuf },
    /// 分组条目使用了未知的展开方式
    UnknownKind { keyword: String, kind: String },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::MissingFile { keyword } => {
                write!(f, "no fragment matches '{}'", keyword)
            }
            ResolutionWarning::MissingDirectory { keyword } => {
                write!(f, "no directory matches '{}'", keyword)
            }
            ResolutionWarning::EmptyDirectory { dir } => {
                write!(f, "no chapter fragments in {}", dir.display())
            }
            ResolutionWarning::UnknownKind { keyword, kind } => {
                write!(f, "unknown group kind '{}' for '{}'", kind, keyword)
            }
        }
    }
}

/// 去重后的有序片段列表
#[derive(Debug, Clone, Default)]
pub struct OrderedFragments {
    pub fragments: Vec<Fragment>,
    pub warnings: Vec<ResolutionWarning>,
}

impl OrderedFragments {
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.fragments.iter().map(Fragment::path).collect()
    }
}

/// 源目录索引：递归收集的 `.docx` 文件与子目录
struct SourceIndex {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl SourceIndex {
    fn scan(root: &Path) -> Result<Self, BuildError> {
        let mut index = SourceIndex {
            files: Vec::new(),
            dirs: Vec::new(),
        };
        index.visit(root)?;
        Ok(index)
    }

    fn visit(&mut self, dir: &Path) -> Result<(), BuildError> {
        for (path, file_type) in read_dir_sorted(dir)? {
            if file_type.is_dir() {
                self.dirs.push(path.clone());
                self.visit(&path)?;
            } else if file_type.is_file() && is_fragment_file(&path) {
                self.files.push(path);
            }
        }
        Ok(())
    }

    /// 文件名包含关键字的片段，路径最短者优先，其次按文件名自然排序
    fn find_file(&self, keyword: &str) -> Option<PathBuf> {
        let needle = keyword.to_lowercase();
        let mut candidates: Vec<&PathBuf> = self
            .files
            .iter()
            .filter(|p| file_stem_lower(p).contains(&needle))
            .collect();

        candidates.sort_by_key(|p| (p.components().count(), natural_key(&file_name(p))));
        candidates.first().map(|p| (*p).clone())
    }

    /// 目录名包含关键字的目录，层级最浅者优先，其次按小写目录名排序
    fn find_dir(&self, keyword: &str) -> Option<PathBuf> {
        let needle = keyword.to_lowercase();
        let mut candidates: Vec<&PathBuf> = self
            .dirs
            .iter()
            .filter(|d| file_name(d).to_lowercase().contains(&needle))
            .collect();

        candidates.sort_by_key(|d| (d.components().count(), file_name(d).to_lowercase()));
        candidates.first().map(|d| (*d).clone())
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<(PathBuf, fs::FileType)>, BuildError> {
    let io_err = |source| BuildError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_type = entry.file_type().map_err(io_err)?;
        // 不跟随符号链接，避免目录环
        if file_type.is_symlink() {
            continue;
        }
        entries.push((entry.path(), file_type));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem_lower(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// `.docx` 扩展名（不区分大小写），排除 Word 的 `~$` 锁文件
pub fn is_fragment_file(path: &Path) -> bool {
    let is_docx = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("docx"))
        .unwrap_or(false);

    is_docx && !file_name(path).starts_with("~$")
}

/// 列出目录下直接包含的片段，按自然顺序排列
pub fn list_chapters(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut chapters: Vec<PathBuf> = read_dir_sorted(dir)?
        .into_iter()
        .filter(|(path, file_type)| file_type.is_file() && is_fragment_file(path))
        .map(|(path, _)| path)
        .collect();

    chapters.sort_by_key(|p| natural_key(&file_name(p)));
    Ok(chapters)
}

/// 按目录规格解析源目录，得到去重后的片段顺序
///
/// 找不到的条目只产生警告；最终列表为空时返回 [`BuildError::NoFragments`]。
pub fn build_order(root: &Path, spec: &TocSpec) -> Result<OrderedFragments, BuildError> {
    let root = root
        .canonicalize()
        .map_err(|_| BuildError::MissingInput(root.to_path_buf()))?;
    if !root.is_dir() {
        return Err(BuildError::MissingInput(root));
    }

    let index = SourceIndex::scan(&root)?;
    tracing::debug!(
        "源目录索引: {} 个片段, {} 个目录",
        index.files.len(),
        index.dirs.len()
    );

    let mut ordered: Vec<PathBuf> = Vec::new();
    let mut warnings: Vec<ResolutionWarning> = Vec::new();

    for entry in &spec.entries {
        match entry {
            TocEntry::Single { keyword } => match index.find_file(keyword) {
                Some(path) => ordered.push(path),
                None => warnings.push(ResolutionWarning::MissingFile {
                    keyword: keyword.clone(),
                }),
            },
            TocEntry::Group { keyword, kind } => {
                let Some(dir) = index.find_dir(keyword) else {
                    warnings.push(ResolutionWarning::MissingDirectory {
                        keyword: keyword.clone(),
                    });
                    continue;
                };

                match kind {
                    GroupKind::Chapters => {
                        let chapters = list_chapters(&dir)?;
                        if chapters.is_empty() {
                            warnings.push(ResolutionWarning::EmptyDirectory { dir });
                        }
                        ordered.extend(chapters);
                    }
                    GroupKind::Other(other) => {
                        warnings.push(ResolutionWarning::UnknownKind {
                            keyword: keyword.clone(),
                            kind: other.clone(),
                        });
                    }
                }
            }
        }
    }

    for warning in &warnings {
        tracing::warn!("目录解析警告: {}", warning);
    }

    // 去重，保留首次出现的位置
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let fragments: Vec<Fragment> = ordered
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .map(Fragment::new)
        .collect();

    if fragments.is_empty() {
        return Err(BuildError::NoFragments(root));
    }

    tracing::info!("片段排序完成: {} 个片段", fragments.len());
    Ok(OrderedFragments {
        fragments,
        warnings,
    })
}
