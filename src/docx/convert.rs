//! DOCX 转 HTML
//!
//! 只做语义映射，不保留版式：段落样式决定标题和代码块，字符样式决定行内代码，
//! 显式字体写成 `font-family` 行内样式，供翻译阶段识别等宽字体。
//! 图片复制到 HTML 同目录的 `media/` 下，以相对路径引用。

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::package::{target_part_name, DocxPackage, DOCUMENT_PART, DOCUMENT_RELS_PART, STYLES_PART};
use super::xml::{parse_tree, XmlElement, XmlNode};
use super::{DocxError, DocxResult};
use crate::parsers::css::format_font_family;

/// 图片目录名，相对于 HTML 文件
pub const MEDIA_DIR_NAME: &str = "media";

/// 段落映射结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph,
    Heading(u8),
    /// `pre` 元素及其 class
    Code(String),
}

/// 样式映射
///
/// 样式按 id 或名称匹配，比较时忽略大小写和空白。
#[derive(Debug, Clone)]
pub struct StyleMap {
    code_paragraphs: Vec<(String, String)>,
    code_runs: Vec<String>,
}

impl Default for StyleMap {
    fn default() -> Self {
        Self {
            code_paragraphs: [
                ("Code", "code"),
                ("Code Block", "code-block"),
                ("Source Code", "source-code"),
                ("Console", "console"),
            ]
            .iter()
            .map(|(style, class)| (normalize_style(style), class.to_string()))
            .collect(),
            code_runs: ["Code", "Inline Code"]
                .iter()
                .map(|s| normalize_style(s))
                .collect(),
        }
    }
}

fn normalize_style(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl StyleMap {
    /// 增加一个映射为 `pre.{class}` 的段落样式
    pub fn with_code_paragraph(mut self, style: &str, class: &str) -> Self {
        self.code_paragraphs
            .push((normalize_style(style), class.to_string()));
        self
    }

    /// 增加一个映射为 `code` 的字符样式
    pub fn with_code_run(mut self, style: &str) -> Self {
        self.code_runs.push(normalize_style(style));
        self
    }

    pub fn block_for(&self, candidates: &[&str]) -> Block {
        for candidate in candidates.iter().map(|c| normalize_style(c)) {
            if let Some((_, class)) = self.code_paragraphs.iter().find(|(s, _)| *s == candidate) {
                return Block::Code(class.clone());
            }
            if candidate == "title" {
                return Block::Heading(1);
            }
            if let Some(level) = candidate
                .strip_prefix("heading")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=6).contains(n))
            {
                return Block::Heading(level);
            }
        }
        Block::Paragraph
    }

    pub fn is_code_run(&self, candidates: &[&str]) -> bool {
        candidates
            .iter()
            .map(|c| normalize_style(c))
            .any(|c| self.code_runs.contains(&c))
    }
}

/// 转换统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub paragraphs: usize,
    pub headings: usize,
    pub code_blocks: usize,
    pub list_items: usize,
    pub tables: usize,
    pub links: usize,
    pub images: usize,
    pub missing_images: usize,
}

/// DOCX 转 HTML 转换器
#[derive(Debug, Clone, Default)]
pub struct DocxConverter {
    style_map: StyleMap,
    title: String,
}

impl DocxConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style_map(mut self, style_map: StyleMap) -> Self {
        self.style_map = style_map;
        self
    }

    /// 写入 `<title>` 的文档标题
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// 转换文件，图片写到 `html` 同目录的 `media/`
    pub fn convert_file(&self, docx: &Path, html: &Path) -> DocxResult<ConvertStats> {
        let package = DocxPackage::read(docx)?;
        let html_dir = html
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let (document, stats) = self.convert(&package, html_dir)?;

        fs::create_dir_all(html_dir).map_err(|source| DocxError::Io {
            path: html_dir.to_path_buf(),
            source,
        })?;
        fs::write(html, document).map_err(|source| DocxError::Io {
            path: html.to_path_buf(),
            source,
        })?;

        tracing::info!(
            "已转换 {} -> {} (段落 {}, 标题 {}, 代码块 {}, 表格 {}, 图片 {})",
            docx.display(),
            html.display(),
            stats.paragraphs,
            stats.headings,
            stats.code_blocks,
            stats.tables,
            stats.images
        );
        Ok(stats)
    }

    /// 转换为完整的 HTML 文档
    pub fn convert(&self, package: &DocxPackage, html_dir: &Path) -> DocxResult<(String, ConvertStats)> {
        let document = parse_tree(DOCUMENT_PART, package.require(DOCUMENT_PART)?)?;
        let body = document
            .child("body")
            .ok_or_else(|| DocxError::xml(DOCUMENT_PART, "missing w:body"))?;

        let mut writer = HtmlWriter {
            map: &self.style_map,
            style_names: read_style_names(package)?,
            rels: read_relationships(package)?,
            package,
            html_dir,
            out: String::new(),
            stats: ConvertStats::default(),
            extracted: HashSet::new(),
        };
        writer.blocks(&body.children)?;

        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape_html(&self.title),
            writer.out
        );
        Ok((html, writer.stats))
    }
}

/// 样式 id 到样式名
fn read_style_names(package: &DocxPackage) -> DocxResult<HashMap<String, String>> {
    let Some(data) = package.part(STYLES_PART) else {
        return Ok(HashMap::new());
    };
    let styles = parse_tree(STYLES_PART, data)?;
    Ok(styles
        .elements()
        .filter(|e| e.local_name() == "style")
        .filter_map(|style| {
            let id = style.attr("w:styleId")?;
            let name = style.child("name").and_then(|n| n.attr("w:val"))?;
            Some((id, name))
        })
        .collect())
}

struct Relationship {
    target: String,
    external: bool,
}

fn read_relationships(package: &DocxPackage) -> DocxResult<HashMap<String, Relationship>> {
    let Some(data) = package.part(DOCUMENT_RELS_PART) else {
        return Ok(HashMap::new());
    };
    let rels = parse_tree(DOCUMENT_RELS_PART, data)?;
    Ok(rels
        .elements()
        .filter_map(|rel| {
            Some((
                rel.attr("Id")?,
                Relationship {
                    target: rel.attr("Target")?,
                    external: rel.attr("TargetMode").as_deref() == Some("External"),
                },
            ))
        })
        .collect())
}

/// 转义文本和属性值
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// 开关型字符属性（`w:b`、`w:i`）是否打开
fn toggled(props: &XmlElement, local: &str) -> bool {
    props
        .child(local)
        .map(|e| !matches!(e.attr("w:val").as_deref(), Some("0" | "false" | "none")))
        .unwrap_or(false)
}

/// 代码段落的纯文本
fn plain_text(element: &XmlElement, out: &mut String) {
    for child in element.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            "pPr" | "rPr" | "instrText" | "delText" | "del" => {}
            _ => plain_text(child, out),
        }
    }
}

struct HtmlWriter<'a> {
    map: &'a StyleMap,
    style_names: HashMap<String, String>,
    rels: HashMap<String, Relationship>,
    package: &'a DocxPackage,
    html_dir: &'a Path,
    out: String,
    stats: ConvertStats,
    extracted: HashSet<String>,
}

impl HtmlWriter<'_> {
    /// 样式 id 及其名称，作为样式映射的候选
    fn style_candidates(&self, id: Option<String>) -> Vec<String> {
        let Some(id) = id else {
            return Vec::new();
        };
        match self.style_names.get(&id) {
            Some(name) => vec![id.clone(), name.clone()],
            None => vec![id],
        }
    }

    fn blocks(&mut self, nodes: &[XmlNode]) -> DocxResult<()> {
        let mut code: Option<(String, Vec<String>)> = None;
        let mut in_list = false;

        for node in nodes {
            let XmlNode::Element(element) = node else {
                continue;
            };

            match element.local_name() {
                "p" => {
                    let props = element.child("pPr");
                    let style_id = props
                        .and_then(|p| p.child("pStyle"))
                        .and_then(|s| s.attr("w:val"));
                    let candidates = self.style_candidates(style_id);
                    let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
                    let block = self.map.block_for(&candidates);
                    let is_list = block == Block::Paragraph
                        && props.and_then(|p| p.child("numPr")).is_some();

                    if in_list && !is_list {
                        self.out.push_str("</ul>\n");
                        in_list = false;
                    }

                    if let Block::Code(class) = &block {
                        let mut line = String::new();
                        plain_text(element, &mut line);
                        match code.as_mut() {
                            Some((current, lines)) if current == class => lines.push(line),
                            _ => {
                                self.flush_code(code.take());
                                code = Some((class.clone(), vec![line]));
                            }
                        }
                        continue;
                    }
                    self.flush_code(code.take());

                    let inner = self.inline(element)?;
                    if is_list {
                        if !in_list {
                            self.out.push_str("<ul>\n");
                            in_list = true;
                        }
                        self.out.push_str(&format!("<li>{}</li>\n", inner));
                        self.stats.list_items += 1;
                        continue;
                    }
                    if inner.trim().is_empty() {
                        continue;
                    }
                    match block {
                        Block::Heading(level) => {
                            self.out
                                .push_str(&format!("<h{0}>{1}</h{0}>\n", level, inner));
                            self.stats.headings += 1;
                        }
                        _ => {
                            self.out.push_str(&format!("<p>{}</p>\n", inner));
                            self.stats.paragraphs += 1;
                        }
                    }
                }
                "tbl" => {
                    self.flush_code(code.take());
                    if in_list {
                        self.out.push_str("</ul>\n");
                        in_list = false;
                    }
                    self.table(element)?;
                }
                "sdt" => {
                    self.flush_code(code.take());
                    if let Some(content) = element.child("sdtContent") {
                        self.blocks(&content.children)?;
                    }
                }
                _ => {}
            }
        }

        self.flush_code(code);
        if in_list {
            self.out.push_str("</ul>\n");
        }
        Ok(())
    }

    fn flush_code(&mut self, code: Option<(String, Vec<String>)>) {
        if let Some((class, lines)) = code {
            self.out.push_str(&format!(
                "<pre class=\"{}\">{}</pre>\n",
                escape_html(&class),
                escape_html(&lines.join("\n"))
            ));
            self.stats.code_blocks += 1;
        }
    }

    fn table(&mut self, table: &XmlElement) -> DocxResult<()> {
        self.out.push_str("<table>\n");
        for row in table.elements().filter(|e| e.local_name() == "tr") {
            self.out.push_str("<tr>");
            for cell in row.elements().filter(|e| e.local_name() == "tc") {
                self.out.push_str("<td>");
                self.blocks(&cell.children)?;
                self.out.push_str("</td>");
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</table>\n");
        self.stats.tables += 1;
        Ok(())
    }

    fn inline(&mut self, element: &XmlElement) -> DocxResult<String> {
        let mut html = String::new();
        for child in element.elements() {
            match child.local_name() {
                "r" => html.push_str(&self.run(child)?),
                "hyperlink" => {
                    let href = match child.attr("r:id") {
                        Some(id) => self.rels.get(&id).map(|rel| rel.target.clone()),
                        None => child.attr("w:anchor").map(|anchor| format!("#{}", anchor)),
                    };
                    let inner = self.inline(child)?;
                    match href {
                        Some(href) => {
                            html.push_str(&format!(
                                "<a href=\"{}\">{}</a>",
                                escape_html(&href),
                                inner
                            ));
                            self.stats.links += 1;
                        }
                        None => html.push_str(&inner),
                    }
                }
                "ins" | "smartTag" | "fldSimple" | "customXml" => {
                    html.push_str(&self.inline(child)?)
                }
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        html.push_str(&self.inline(content)?);
                    }
                }
                _ => {}
            }
        }
        Ok(html)
    }

    fn run(&mut self, run: &XmlElement) -> DocxResult<String> {
        let props = run.child("rPr");
        let style_id = props
            .and_then(|p| p.child("rStyle"))
            .and_then(|s| s.attr("w:val"));
        let candidates = self.style_candidates(style_id);
        let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let is_code = self.map.is_code_run(&candidates);

        let mut content = String::new();
        for child in run.elements() {
            match child.local_name() {
                "t" => content.push_str(&escape_html(&child.text())),
                "tab" => content.push('\t'),
                "br" | "cr" => content.push_str("<br>"),
                "noBreakHyphen" => content.push('-'),
                "drawing" | "pict" | "object" => content.push_str(&self.image(child)?),
                _ => {}
            }
        }
        if content.is_empty() {
            return Ok(content);
        }

        let font = props
            .and_then(|p| p.child("rFonts"))
            .and_then(|f| f.attr("w:ascii").or_else(|| f.attr("w:hAnsi")));

        if is_code {
            content = format!("<code>{}</code>", content);
        } else if let Some(font) = font {
            content = format!(
                "<span style=\"font-family: {}\">{}</span>",
                escape_html(&format_font_family(&font)),
                content
            );
        }
        if props.is_some_and(|p| toggled(p, "i")) {
            content = format!("<em>{}</em>", content);
        }
        if props.is_some_and(|p| toggled(p, "b")) {
            content = format!("<strong>{}</strong>", content);
        }
        Ok(content)
    }

    fn image(&mut self, container: &XmlElement) -> DocxResult<String> {
        let id = container
            .find("blip")
            .and_then(|b| b.attr("r:embed"))
            .or_else(|| container.find("imagedata").and_then(|i| i.attr("r:id")));
        let Some(id) = id else {
            return Ok(String::new());
        };
        let alt = container
            .find("docPr")
            .and_then(|d| d.attr("descr"))
            .unwrap_or_default();

        let Some(rel) = self.rels.get(&id) else {
            tracing::warn!("图片关系不存在: {}", id);
            self.stats.missing_images += 1;
            return Ok(String::new());
        };

        if rel.external {
            self.stats.images += 1;
            return Ok(format!(
                "<img src=\"{}\" alt=\"{}\">",
                escape_html(&rel.target),
                escape_html(&alt)
            ));
        }

        let part = target_part_name(&rel.target);
        let Some(data) = self.package.part(&part) else {
            tracing::warn!("图片部件不存在: {}", part);
            self.stats.missing_images += 1;
            return Ok(String::new());
        };
        let file_name = part.rsplit('/').next().unwrap_or(&part).to_string();

        if self.extracted.insert(file_name.clone()) {
            let media_dir = self.html_dir.join(MEDIA_DIR_NAME);
            fs::create_dir_all(&media_dir).map_err(|source| DocxError::Io {
                path: media_dir.clone(),
                source,
            })?;
            let path = media_dir.join(&file_name);
            fs::write(&path, data).map_err(|source| DocxError::Io { path, source })?;
        }

        self.stats.images += 1;
        Ok(format!(
            "<img src=\"{}/{}\" alt=\"{}\">",
            MEDIA_DIR_NAME,
            escape_html(&file_name),
            escape_html(&alt)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::builder::DocxBuilder;

    fn convert(builder: DocxBuilder) -> (String, ConvertStats, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (html, stats) = DocxConverter::new()
            .with_title("Book")
            .convert(&builder.build(), dir.path())
            .unwrap();
        (html, stats, dir)
    }

    #[test]
    fn test_style_map() {
        let map = StyleMap::default();
        assert_eq!(map.block_for(&["Heading2"]), Block::Heading(2));
        assert_eq!(map.block_for(&["Heading1", "heading 1"]), Block::Heading(1));
        assert_eq!(map.block_for(&["Title"]), Block::Heading(1));
        assert_eq!(map.block_for(&["CodeBlock"]), Block::Code("code-block".into()));
        assert_eq!(map.block_for(&["x", "Source Code"]), Block::Code("source-code".into()));
        assert_eq!(map.block_for(&["Heading9"]), Block::Paragraph);
        assert_eq!(map.block_for(&[]), Block::Paragraph);
        assert!(map.is_code_run(&["InlineCode"]));
        assert!(!map.is_code_run(&["Emphasis"]));

        let custom = StyleMap::default().with_code_paragraph("Terminal", "terminal");
        assert_eq!(custom.block_for(&["terminal"]), Block::Code("terminal".into()));
    }

    #[test]
    fn test_headings_paragraphs_and_code() {
        let (html, stats, _dir) = convert(
            DocxBuilder::new()
                .heading(0, "Agentic Design Patterns")
                .heading(2, "Prompt <Chaining>")
                .paragraph("An agent plans.")
                .code_block("import os\nprint(os.getcwd())")
                .paragraph_with_code("Call ", "run()", " now."),
        );

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Book</title>"));
        assert!(html.contains("<h1>Agentic Design Patterns</h1>"));
        assert!(html.contains("<h2>Prompt &lt;Chaining&gt;</h2>"));
        assert!(html.contains("<p>An agent plans.</p>"));
        assert!(html.contains("<pre class=\"code\">import os\nprint(os.getcwd())</pre>"));
        assert!(html.contains("<p>Call <code>run()</code> now.</p>"));
        assert_eq!(stats.code_blocks, 1);
        assert_eq!(stats.headings, 2);
    }

    #[test]
    fn test_fonts_lists_tables_links() {
        let (html, stats, _dir) = convert(
            DocxBuilder::new()
                .font_paragraph("Courier New", "ls -la")
                .list_item("first")
                .list_item("second")
                .table(&[&["Name", "Value"], &["x = 5", "Hello there"]])
                .hyperlink("docs", "https://example.com/a?b=1&c=2"),
        );

        assert!(html.contains("<span style=\"font-family: &quot;Courier New&quot;\">ls -la</span>"));
        assert!(html.contains("<ul>\n<li>first</li>\n<li>second</li>\n</ul>"));
        assert!(html.contains("<tr><td><p>x = 5</p>\n</td><td><p>Hello there</p>\n</td></tr>"));
        assert!(html.contains("<a href=\"https://example.com/a?b=1&amp;c=2\">docs</a>"));
        assert_eq!(stats.list_items, 2);
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.links, 1);
    }

    #[test]
    fn test_images_are_extracted() {
        let (html, stats, dir) =
            convert(DocxBuilder::new().image("figure1.png", b"\x89PNG\r\n\x1a\ndata"));

        assert!(html.contains("<img src=\"media/figure1.png\" alt=\"figure1.png\">"));
        assert_eq!(stats.images, 1);
        assert_eq!(
            fs::read(dir.path().join("media/figure1.png")).unwrap(),
            b"\x89PNG\r\n\x1a\ndata"
        );
    }

    #[test]
    fn test_convert_file_writes_html() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("master_en.docx");
        let html = dir.path().join("out/master_en.html");
        DocxBuilder::new().heading(1, "Chapter 1").write(&docx).unwrap();

        let stats = DocxConverter::new().convert_file(&docx, &html).unwrap();
        assert_eq!(stats.headings, 1);
        assert!(fs::read_to_string(&html).unwrap().contains("<h1>Chapter 1</h1>"));
    }
}
