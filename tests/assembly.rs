//! 合并与 HTML 转换集成测试

use std::fs;

use bookbinder::core::{BookOptions, Pipeline};
use bookbinder::docx::{DocxBuilder, AUTO_COVER_NAME};

mod common;

use common::FixtureTree;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

struct Book {
    dir: tempfile::TempDir,
    tree: FixtureTree,
}

impl Book {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tree = FixtureTree::new(&dir.path().join("src"));
        Self { dir, tree }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(BookOptions {
            src_dir: Some(self.tree.root().to_path_buf()),
            work_dir: self.dir.path().join("work"),
            output_dir: self.dir.path().join("output"),
            assets_dir: self.dir.path().join("assets"),
            title: "Agentic Design Patterns".to_string(),
            ..BookOptions::default()
        })
    }

    fn html(&self) -> String {
        fs::read_to_string(self.dir.path().join("work/master_en.html")).unwrap()
    }
}

/// 图片从片段中提取后以 data URL 嵌入，代码块和标题保持结构
#[test]
fn test_images_are_inlined() {
    let book = Book::new();
    DocxBuilder::new()
        .heading(1, "Introduction")
        .paragraph("Agents act on their own.")
        .image("diagram.png", PNG)
        .code_block("print('hello')")
        .write(&book.tree.root().join("Introduction.docx"))
        .unwrap();

    let pipeline = book.pipeline();
    let ordered = pipeline.order().unwrap();
    let report = pipeline.assemble(&ordered).unwrap();

    assert_eq!(report.compose.parts, 2);
    assert_eq!(report.convert.images, 1);
    assert_eq!(report.images.inlined, 1);
    assert_eq!(report.images.missing, 0);
    // 封面标题和章节标题
    assert_eq!(report.toc_entries, 2);

    let html = book.html();
    assert!(html.contains("src=\"data:image/png;base64,"));
    assert!(!html.contains("src=\"media/"));
    assert!(html.contains("print('hello')"));
    assert!(html.contains("<title>Agentic Design Patterns</title>"));
    assert!(html.find("Contents").unwrap() < html.find("Agents act on their own.").unwrap());
}

/// 提供了目录文档时不再生成自动目录
#[test]
fn test_supplied_toc_document_disables_auto_toc() {
    let book = Book::new();
    book.tree
        .chapter("Introduction.docx", "Introduction", "Why agents matter.");
    let assets = book.dir.path().join("assets");
    DocxBuilder::new()
        .heading(1, "Table of Contents")
        .paragraph("Introduction .......... 1")
        .write(&assets.join("toc.docx"))
        .unwrap();

    let pipeline = book.pipeline();
    let ordered = pipeline.order().unwrap();
    let report = pipeline.assemble(&ordered).unwrap();

    assert_eq!(report.compose.parts, 3);
    assert_eq!(report.toc_entries, 0);

    let html = book.html();
    assert!(!html.contains("auto-toc"));
    assert!(html.find("Table of Contents").unwrap() < html.find("Why agents matter.").unwrap());
}

/// 提供了封面时使用它，不生成自动封面
#[test]
fn test_supplied_cover_is_used() {
    let book = Book::new();
    book.tree
        .chapter("Introduction.docx", "Introduction", "Why agents matter.");
    DocxBuilder::new()
        .paragraph("A Hands-On Guide")
        .write(&book.dir.path().join("assets/cover.docx"))
        .unwrap();

    let pipeline = book.pipeline();
    let ordered = pipeline.order().unwrap();
    let report = pipeline.assemble(&ordered).unwrap();

    assert_eq!(report.compose.parts, 2);
    assert!(!book.dir.path().join("work").join(AUTO_COVER_NAME).exists());

    let html = book.html();
    assert!(html.find("A Hands-On Guide").unwrap() < html.find("Why agents matter.").unwrap());
}
