//! 从零生成 .docx
//!
//! 生成的包只含最少的部件：内容类型、包关系、正文、正文关系和一份样式表。
//! 样式表定义了 `Title`、`Heading1..3`、`Code` 和 `InlineCode`，足够封面和章节片段使用。

use std::path::Path;

use super::package::{
    DocxPackage, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, STYLES_PART,
};
use super::xml::escape_text;
use super::DocxResult;
use crate::utils::url::detect_media_type_by_file_name;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// 图片显示尺寸，EMU
const IMAGE_EXTENT: u32 = 1_905_000;

struct Relationship {
    id: String,
    rel_type: &'static str,
    target: String,
    external: bool,
}

/// 文档构建器
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    relationships: Vec<Relationship>,
    media: Vec<(String, Vec<u8>)>,
    section: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标题段落；`level` 为 0 时使用 `Title` 样式
    pub fn heading(self, level: u8, text: &str) -> Self {
        let style = match level {
            0 => "Title".to_string(),
            n => format!("Heading{}", n.min(6)),
        };
        self.styled_paragraph(&style, text)
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!("<w:p>{}</w:p>", text_run(text, "")));
        self
    }

    pub fn styled_paragraph(mut self, style_id: &str, text: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>{}</w:p>",
            escape_text(style_id),
            text_run(text, "")
        ));
        self
    }

    /// 代码段落，每行一个段落
    pub fn code_block(mut self, code: &str) -> Self {
        for line in code.lines() {
            self = self.styled_paragraph("Code", line);
        }
        self
    }

    /// 由普通文字和行内代码组成的段落
    pub fn paragraph_with_code(mut self, before: &str, code: &str, after: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p>{}{}{}</w:p>",
            text_run(before, ""),
            text_run(code, "<w:rStyle w:val=\"InlineCode\"/>"),
            text_run(after, "")
        ));
        self
    }

    /// 使用指定字体的段落
    pub fn font_paragraph(mut self, font: &str, text: &str) -> Self {
        let font = escape_text(font);
        let props = format!("<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\"/>");
        self.body
            .push_str(&format!("<w:p>{}</w:p>", text_run(text, &props)));
        self
    }

    /// 编号列表项
    pub fn list_item(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr></w:pPr>{}</w:p>",
            text_run(text, "")
        ));
        self
    }

    pub fn hyperlink(mut self, text: &str, url: &str) -> Self {
        let id = self.add_relationship(HYPERLINK_REL_TYPE, url.to_string(), true);
        self.body.push_str(&format!(
            "<w:p><w:hyperlink r:id=\"{}\">{}</w:hyperlink></w:p>",
            id,
            text_run(text, "")
        ));
        self
    }

    /// 每行一个 `tr`，每格一个段落
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in row.iter() {
                self.body
                    .push_str(&format!("<w:tc><w:p>{}</w:p></w:tc>", text_run(cell, "")));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// 嵌入一张图片，单独成段
    pub fn image(mut self, file_name: &str, data: &[u8]) -> Self {
        let id = self.add_relationship(IMAGE_REL_TYPE, format!("media/{}", file_name), false);
        let n = self.relationships.len();
        self.media
            .push((format!("word/media/{}", file_name), data.to_vec()));
        self.body.push_str(&format!(
            concat!(
                "<w:p><w:r><w:drawing><wp:inline>",
                "<wp:extent cx=\"{ext}\" cy=\"{ext}\"/>",
                "<wp:docPr id=\"{n}\" name=\"Picture {n}\" descr=\"{name}\"/>",
                "<a:graphic><a:graphicData uri=\"{pic_ns}\"><pic:pic>",
                "<pic:nvPicPr><pic:cNvPr id=\"{n}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>",
                "<pic:blipFill><a:blip r:embed=\"{id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>",
                "<pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{ext}\" cy=\"{ext}\"/></a:xfrm>",
                "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>",
                "</pic:pic></a:graphicData></a:graphic>",
                "</wp:inline></w:drawing></w:r></w:p>"
            ),
            ext = IMAGE_EXTENT,
            n = n,
            name = escape_text(file_name),
            pic_ns = PIC_NS,
            id = id,
        ));
        self
    }

    /// 在正文末尾加入节属性（A4 纵向）
    pub fn with_section(mut self) -> Self {
        self.section = true;
        self
    }

    fn add_relationship(&mut self, rel_type: &'static str, target: String, external: bool) -> String {
        // rId1 留给样式表
        let id = format!("rId{}", self.relationships.len() + 2);
        self.relationships.push(Relationship {
            id: id.clone(),
            rel_type,
            target,
            external,
        });
        id
    }

    /// 生成内存中的包
    pub fn build(&self) -> DocxPackage {
        let mut package = DocxPackage::new();
        package.put(CONTENT_TYPES_PART, self.content_types().into_bytes());
        package.put("_rels/.rels", ROOT_RELS.as_bytes().to_vec());
        package.put(DOCUMENT_PART, self.document().into_bytes());
        package.put(DOCUMENT_RELS_PART, self.document_rels().into_bytes());
        package.put(STYLES_PART, STYLES.as_bytes().to_vec());
        for (name, data) in &self.media {
            package.put(name, data.clone());
        }
        package
    }

    pub fn write(&self, path: &Path) -> DocxResult<()> {
        self.build().write(path)
    }

    fn document(&self) -> String {
        let section = if self.section {
            "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/></w:sectPr>"
        } else {
            ""
        };
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\" xmlns:wp=\"{WP_NS}\" xmlns:a=\"{A_NS}\" xmlns:pic=\"{PIC_NS}\">\
             <w:body>{}{}</w:body></w:document>",
            self.body, section
        )
    }

    fn document_rels(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        xml.push_str(&format!(
            "<Relationship Id=\"rId1\" Type=\"{STYLES_REL_TYPE}\" Target=\"styles.xml\"/>"
        ));
        for rel in &self.relationships {
            let mode = if rel.external {
                " TargetMode=\"External\""
            } else {
                ""
            };
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
                rel.id,
                rel.rel_type,
                escape_text(&rel.target),
                mode
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn content_types(&self) -> String {
        let mut extensions: Vec<String> = self
            .media
            .iter()
            .filter_map(|(name, _)| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()))
            .collect();
        extensions.sort();
        extensions.dedup();

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        );
        for ext in extensions {
            let content_type =
                detect_media_type_by_file_name(&format!("x.{}", ext)).unwrap_or("application/octet-stream");
            xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                ext, content_type
            ));
        }
        xml.push_str(
            "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
             <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
             </Types>",
        );
        xml
    }
}

fn text_run(text: &str, props: &str) -> String {
    let props = if props.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{}</w:rPr>", props)
    };
    let mut runs = String::new();
    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            runs.push_str("<w:tab/>");
        }
        if !segment.is_empty() {
            runs.push_str(&format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape_text(segment)
            ));
        }
    }
    format!("<w:r>{}{}</w:r>", props, runs)
}

/// 生成封面：`Title` 样式的书名和一段副标题
pub fn write_cover(path: &Path, title: &str, subtitle: &str) -> DocxResult<()> {
    DocxBuilder::new()
        .heading(0, title)
        .paragraph(subtitle)
        .with_section()
        .write(path)?;
    tracing::info!("已生成封面: {}", path.display());
    Ok(())
}

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
</Relationships>";

const STYLES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Title\"><w:name w:val=\"Title\"/><w:basedOn w:val=\"Normal\"/></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading1\"><w:name w:val=\"heading 1\"/><w:basedOn w:val=\"Normal\"/></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading2\"><w:name w:val=\"heading 2\"/><w:basedOn w:val=\"Normal\"/></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Heading3\"><w:name w:val=\"heading 3\"/><w:basedOn w:val=\"Normal\"/></w:style>\
<w:style w:type=\"paragraph\" w:styleId=\"Code\"><w:name w:val=\"Code\"/><w:basedOn w:val=\"Normal\"/>\
<w:rPr><w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\"/></w:rPr></w:style>\
<w:style w:type=\"character\" w:styleId=\"InlineCode\"><w:name w:val=\"Inline Code\"/></w:style>\
</w:styles>";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::parse_tree;

    #[test]
    fn test_build_has_required_parts() {
        let package = DocxBuilder::new()
            .heading(1, "Chapter 1")
            .paragraph("Hello & welcome")
            .image("figure.png", b"\x89PNG\r\n\x1a\nfake")
            .build();

        for part in [CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, STYLES_PART] {
            assert!(package.contains(part), "missing {}", part);
        }
        assert!(package.contains("word/media/figure.png"));

        let doc = parse_tree(DOCUMENT_PART, package.part(DOCUMENT_PART).unwrap()).unwrap();
        assert!(doc.text().contains("Hello & welcome"));
        let blip = doc.find("blip").unwrap();
        assert_eq!(blip.attr("r:embed").as_deref(), Some("rId2"));

        let types = String::from_utf8(package.part(CONTENT_TYPES_PART).unwrap().to_vec()).unwrap();
        assert!(types.contains("Extension=\"png\" ContentType=\"image/png\""));
    }

    #[test]
    fn test_tabs_become_tab_elements() {
        let run = text_run("a\tb", "");
        assert_eq!(
            run,
            "<w:r><w:t xml:space=\"preserve\">a</w:t><w:tab/><w:t xml:space=\"preserve\">b</w:t></w:r>"
        );
    }

    #[test]
    fn test_write_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_auto_cover.docx");
        write_cover(&path, "Agentic Design Patterns", "Korean Edition (Auto-compiled)").unwrap();

        let package = DocxPackage::read(&path).unwrap();
        let doc = parse_tree(DOCUMENT_PART, package.part(DOCUMENT_PART).unwrap()).unwrap();
        assert_eq!(
            doc.find("pStyle").and_then(|s| s.attr("w:val")).as_deref(),
            Some("Title")
        );
        assert!(doc.find("sectPr").is_some());
    }
}
