//! zip 包读写
//!
//! 条目按原顺序保存，写出时保留原有的压缩方式、时间戳和权限位。

use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{DocxError, DocxResult};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const STYLES_PART: &str = "word/styles.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// 正文关系目标对应的包内部件名
///
/// 相对目标相对于 `word/`，以 `/` 开头的目标相对于包根。
pub fn target_part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target),
    }
}

/// 一个包条目
#[derive(Debug, Clone)]
pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl DocxEntry {
    fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            data,
            compression: CompressionMethod::Deflated,
            last_modified: zip::DateTime::default(),
            unix_mode: None,
            is_dir: false,
        }
    }
}

/// 内存中的 .docx 包
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    source: PathBuf,
    entries: Vec<DocxEntry>,
}

impl DocxPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取文件
    pub fn read(path: &Path) -> DocxResult<Self> {
        let file = File::open(path).map_err(|source| DocxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut package = Self::read_from(file, path)?;
        package.source = path.to_path_buf();
        Ok(package)
    }

    /// 从内存读取
    pub fn from_bytes(data: &[u8]) -> DocxResult<Self> {
        Self::read_from(Cursor::new(data), Path::new("<memory>"))
    }

    fn read_from<R: Read + Seek>(reader: R, path: &Path) -> DocxResult<Self> {
        let zip_err = |source| DocxError::Zip {
            path: path.to_path_buf(),
            source,
        };
        let io_err = |source| DocxError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut archive = ZipArchive::new(reader).map_err(zip_err)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(zip_err)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(io_err)?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }

        Ok(Self {
            source: path.to_path_buf(),
            entries,
        })
    }

    /// 来源路径，用于错误信息
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// 读取必需的部件
    pub fn require(&self, name: &str) -> DocxResult<&[u8]> {
        self.part(name).ok_or_else(|| DocxError::MissingPart {
            package: self.source.clone(),
            part: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// 写入部件：已存在则替换内容，否则追加
    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(DocxEntry::new(name, data)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// 写出为文件，自动创建父目录
    pub fn write(&self, path: &Path) -> DocxResult<()> {
        let io_err = |source| DocxError::Io {
            path: path.to_path_buf(),
            source,
        };
        let zip_err = |source| DocxError::Zip {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = File::create(path).map_err(io_err)?;
        let mut zout = ZipWriter::new(file);
        for entry in &self.entries {
            let mut opts = SimpleFileOptions::default()
                .compression_method(entry.compression)
                .last_modified_time(entry.last_modified);
            if let Some(mode) = entry.unix_mode {
                opts = opts.unix_permissions(mode);
            }

            if entry.is_dir || entry.name.ends_with('/') {
                zout.add_directory(entry.name.as_str(), opts)
                    .map_err(zip_err)?;
            } else {
                zout.start_file(entry.name.as_str(), opts).map_err(zip_err)?;
                zout.write_all(&entry.data).map_err(io_err)?;
            }
        }
        zout.finish().map_err(zip_err)?;

        tracing::debug!("写出 {} ({} 个条目)", path.display(), self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_replaces_or_appends() {
        let mut package = DocxPackage::new();
        package.put("word/document.xml", b"<a/>".to_vec());
        package.put("word/media/image1.png", vec![1, 2, 3]);
        package.put("word/document.xml", b"<b/>".to_vec());

        assert_eq!(package.part("word/document.xml"), Some(&b"<b/>"[..]));
        assert_eq!(package.names().count(), 2);
        assert!(package.require("word/styles.xml").is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.docx");

        let mut package = DocxPackage::new();
        package.put(CONTENT_TYPES_PART, b"<Types/>".to_vec());
        package.put(DOCUMENT_PART, b"<w:document/>".to_vec());
        package.write(&path).unwrap();

        let read = DocxPackage::read(&path).unwrap();
        assert_eq!(read.source(), path.as_path());
        assert_eq!(read.part(DOCUMENT_PART), Some(&b"<w:document/>"[..]));
        assert_eq!(
            read.names().collect::<Vec<_>>(),
            vec![CONTENT_TYPES_PART, DOCUMENT_PART]
        );
    }

    #[test]
    fn test_target_part_name() {
        assert_eq!(target_part_name("media/a.png"), "word/media/a.png");
        assert_eq!(target_part_name("/word/media/a.png"), "word/media/a.png");
    }

    #[test]
    fn test_not_a_zip() {
        let err = DocxPackage::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, DocxError::Zip { .. }));
    }
}
