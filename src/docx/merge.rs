//! 按顺序合并多个 .docx
//!
//! 第一个文档提供包骨架（样式、设置、内容类型），后续文档只取正文。
//!
//! - 正文子元素依次拼接，只保留最后一个带节属性的文档的 `w:sectPr`
//! - 正文引用的关系（图片、超链接等）以 `bbN_` 为前缀复制，`N` 是文档序号
//! - 内部目标（媒体文件等）以同样的前缀复制到包内，并补充内容类型
//! - 基础文档没有的样式追加到样式表，同名样式以基础文档为准

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::builder::write_cover;
use super::package::{
    target_part_name, DocxPackage, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART,
    STYLES_PART,
};
use super::xml::{
    child_spans, find_start, local_name, matching_end, parse_events, write_events, XmlEvent,
};
use super::{DocxError, DocxResult};
use crate::utils::url::detect_media_type_by_file_name;

/// 自动封面文件名，写在合并结果旁边
pub const AUTO_COVER_NAME: &str = "_auto_cover.docx";

/// 自动封面的文字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverText {
    pub title: String,
    pub subtitle: String,
}

/// 合并统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeStats {
    pub parts: usize,
    pub body_elements: usize,
    pub relationships: usize,
    pub media: usize,
    pub styles_added: usize,
}

/// 合并结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub path: PathBuf,
    /// 没有提供目录文档时为 true，HTML 阶段需要生成目录
    pub insert_auto_toc: bool,
    pub stats: ComposeStats,
}

/// 封面、目录和章节按顺序合并
///
/// 封面文件不存在时在 `master` 同目录生成自动封面；目录文件不存在时由 HTML 阶段生成目录。
pub fn merge_in_order<P: AsRef<Path>>(
    fragments: &[P],
    master: &Path,
    cover: Option<&Path>,
    toc: Option<&Path>,
    cover_text: &CoverText,
) -> DocxResult<MergeOutcome> {
    let mut parts: Vec<PathBuf> = Vec::with_capacity(fragments.len() + 2);

    match cover.filter(|p| p.is_file()) {
        Some(path) => {
            tracing::info!("使用封面: {}", path.display());
            parts.push(path.to_path_buf());
        }
        None => {
            let dir = master.parent().unwrap_or_else(|| Path::new("."));
            let auto = dir.join(AUTO_COVER_NAME);
            write_cover(&auto, &cover_text.title, &cover_text.subtitle)?;
            parts.push(auto);
        }
    }

    let insert_auto_toc = match toc.filter(|p| p.is_file()) {
        Some(path) => {
            tracing::info!("使用目录文档: {}", path.display());
            parts.push(path.to_path_buf());
            false
        }
        None => true,
    };

    parts.extend(fragments.iter().map(|f| f.as_ref().to_path_buf()));
    let stats = compose(&parts, master)?;

    Ok(MergeOutcome {
        path: master.to_path_buf(),
        insert_auto_toc,
        stats,
    })
}

/// 合并文档并写出
pub fn compose<P: AsRef<Path>>(parts: &[P], output: &Path) -> DocxResult<ComposeStats> {
    let (first, rest) = parts.split_first().ok_or(DocxError::NothingToCompose)?;

    let mut composer = Composer::new(DocxPackage::read(first.as_ref())?)?;
    for (i, path) in rest.iter().enumerate() {
        let path = path.as_ref();
        tracing::debug!("合并 [{}] {}", i + 1, path.display());
        composer.append(i + 1, &DocxPackage::read(path)?)?;
    }

    let (package, stats) = composer.finish()?;
    package.write(output)?;

    tracing::info!(
        "已合并 {} 个文档 -> {} (正文元素 {}, 关系 {}, 媒体 {}, 新增样式 {})",
        stats.parts,
        output.display(),
        stats.body_elements,
        stats.relationships,
        stats.media,
        stats.styles_added
    );
    Ok(stats)
}

/// 正文中去掉 `w:sectPr` 的子元素，以及 `w:sectPr` 本身
struct Body {
    children: Vec<XmlEvent>,
    count: usize,
    sect_pr: Option<Vec<XmlEvent>>,
}

fn split_body(package: &DocxPackage) -> DocxResult<(Vec<XmlEvent>, usize, usize, Body)> {
    let events = parse_events(DOCUMENT_PART, package.require(DOCUMENT_PART)?)?;
    let start = find_start(&events, "body")
        .ok_or_else(|| DocxError::xml(DOCUMENT_PART, "missing w:body"))?;
    let end = matching_end(&events, start)
        .ok_or_else(|| DocxError::xml(DOCUMENT_PART, "unclosed w:body"))?;

    let mut body = Body {
        children: Vec::new(),
        count: 0,
        sect_pr: None,
    };
    for (s, e) in child_spans(&events, start, end) {
        let span = &events[s..=e];
        if span[0].element_name().map(local_name) == Some("sectPr") {
            body.sect_pr = Some(span.to_vec());
        } else {
            body.children.extend_from_slice(span);
            body.count += 1;
        }
    }

    Ok((events, start, end, body))
}

/// 在根元素末尾追加子元素；根为空标签时展开
fn append_to_root(events: &mut Vec<XmlEvent>, extra: Vec<XmlEvent>) {
    if extra.is_empty() {
        return;
    }
    if let Some(pos) = events.iter().rposition(|e| matches!(e, XmlEvent::End { .. })) {
        events.splice(pos..pos, extra);
        return;
    }
    if let Some(pos) = events
        .iter()
        .rposition(|e| matches!(e, XmlEvent::Empty { .. }))
    {
        if let XmlEvent::Empty { name, attrs } = events[pos].clone() {
            let mut replacement = vec![XmlEvent::Start {
                name: name.clone(),
                attrs,
            }];
            replacement.extend(extra);
            replacement.push(XmlEvent::End { name });
            events.splice(pos..=pos, replacement);
        }
    }
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// 根元素下指定本地名的直接子元素的属性列表
fn root_children_attrs(events: &[XmlEvent], local: &str) -> Vec<Vec<(String, String)>> {
    events
        .iter()
        .filter_map(|e| match e {
            XmlEvent::Empty { name, attrs } | XmlEvent::Start { name, attrs }
                if local_name(name) == local =>
            {
                Some(attrs.clone())
            }
            _ => None,
        })
        .collect()
}

const EMPTY_RELS: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"></Relationships>";

/// `media/image1.png` -> `media/bb1_image1.png`
fn prefixed_target(target: &str, prefix: &str) -> String {
    match target.rsplit_once('/') {
        Some((dir, file)) => format!("{}/{}{}", dir, prefix, file),
        None => format!("{}{}", prefix, target),
    }
}

/// 一个源文档的关系改写上下文
struct Relink<'a> {
    prefix: &'a str,
    source: &'a DocxPackage,
    source_rels: &'a HashMap<String, Vec<(String, String)>>,
    source_types: &'a [XmlEvent],
    renamed: HashMap<String, String>,
}

struct Composer {
    package: DocxPackage,
    head: Vec<XmlEvent>,
    tail: Vec<XmlEvent>,
    children: Vec<XmlEvent>,
    sect_pr: Option<Vec<XmlEvent>>,

    rels: Vec<XmlEvent>,
    new_rels: Vec<XmlEvent>,

    types: Vec<XmlEvent>,
    new_types: Vec<XmlEvent>,
    known_extensions: HashSet<String>,
    known_overrides: HashSet<String>,

    styles: Option<Vec<XmlEvent>>,
    new_styles: Vec<XmlEvent>,
    style_ids: HashSet<String>,

    stats: ComposeStats,
}

impl Composer {
    fn new(package: DocxPackage) -> DocxResult<Self> {
        let (events, start, end, body) = split_body(&package)?;

        let rels = parse_events(
            DOCUMENT_RELS_PART,
            package.part(DOCUMENT_RELS_PART).unwrap_or(EMPTY_RELS),
        )?;
        let types = parse_events(CONTENT_TYPES_PART, package.require(CONTENT_TYPES_PART)?)?;

        let known_extensions = root_children_attrs(&types, "Default")
            .iter()
            .filter_map(|a| attr(a, "Extension").map(str::to_lowercase))
            .collect();
        let known_overrides = root_children_attrs(&types, "Override")
            .iter()
            .filter_map(|a| attr(a, "PartName").map(str::to_string))
            .collect();

        let styles = match package.part(STYLES_PART) {
            Some(data) => Some(parse_events(STYLES_PART, data)?),
            None => None,
        };
        let style_ids = styles
            .as_deref()
            .map(|events| {
                root_children_attrs(events, "style")
                    .iter()
                    .filter_map(|a| attr(a, "w:styleId").map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let stats = ComposeStats {
            parts: 1,
            body_elements: body.count,
            ..ComposeStats::default()
        };

        Ok(Self {
            head: events[..=start].to_vec(),
            tail: events[end..].to_vec(),
            children: body.children,
            sect_pr: body.sect_pr,
            package,
            rels,
            new_rels: Vec::new(),
            types,
            new_types: Vec::new(),
            known_extensions,
            known_overrides,
            styles,
            new_styles: Vec::new(),
            style_ids,
            stats,
        })
    }

    fn append(&mut self, index: usize, source: &DocxPackage) -> DocxResult<()> {
        let (_, _, _, mut body) = split_body(source)?;
        let prefix = format!("bb{}_", index);

        let source_rels: HashMap<String, Vec<(String, String)>> = match source.part(DOCUMENT_RELS_PART)
        {
            Some(data) => root_children_attrs(&parse_events(DOCUMENT_RELS_PART, data)?, "Relationship")
                .into_iter()
                .filter_map(|a| attr(&a, "Id").map(|id| (id.to_string(), a.clone())))
                .collect(),
            None => HashMap::new(),
        };
        let source_types = match source.part(CONTENT_TYPES_PART) {
            Some(data) => parse_events(CONTENT_TYPES_PART, data)?,
            None => Vec::new(),
        };

        let mut relink = Relink {
            prefix: &prefix,
            source,
            source_rels: &source_rels,
            source_types: &source_types,
            renamed: HashMap::new(),
        };
        self.relink(&mut body.children, &mut relink);
        // 节属性里的页眉页脚引用同样指向源文档的关系
        if let Some(sect_pr) = body.sect_pr.as_mut() {
            self.relink(sect_pr, &mut relink);
        }

        if let Some(data) = source.part(STYLES_PART) {
            self.merge_styles(&parse_events(STYLES_PART, data)?);
        }

        self.children.append(&mut body.children);
        if body.sect_pr.is_some() {
            self.sect_pr = body.sect_pr;
        }
        self.stats.parts += 1;
        self.stats.body_elements += body.count;
        Ok(())
    }

    /// 把 `r:*` 属性改写为新的关系 ID，并复制被引用的部件
    fn relink(&mut self, events: &mut [XmlEvent], ctx: &mut Relink<'_>) {
        for event in events.iter_mut() {
            let Some(attrs) = event.attrs_mut() else {
                continue;
            };
            for (key, value) in attrs.iter_mut() {
                if !key.starts_with("r:") {
                    continue;
                }
                let Some(rel) = ctx.source_rels.get(value.as_str()) else {
                    continue;
                };
                let new_id = match ctx.renamed.get(value.as_str()) {
                    Some(id) => id.clone(),
                    None => {
                        let id = format!("{}{}", ctx.prefix, value);
                        self.copy_relationship(&id, rel, ctx.prefix, ctx.source, ctx.source_types);
                        ctx.renamed.insert(value.clone(), id.clone());
                        id
                    }
                };
                *value = new_id;
            }
        }
    }

    fn copy_relationship(
        &mut self,
        new_id: &str,
        rel: &[(String, String)],
        prefix: &str,
        source: &DocxPackage,
        source_types: &[XmlEvent],
    ) {
        let rel_type = attr(rel, "Type").unwrap_or_default().to_string();
        let target = attr(rel, "Target").unwrap_or_default().to_string();
        let external = attr(rel, "TargetMode") == Some("External");

        let mut attrs = vec![
            ("Id".to_string(), new_id.to_string()),
            ("Type".to_string(), rel_type),
        ];

        if external {
            attrs.push(("Target".to_string(), target));
            attrs.push(("TargetMode".to_string(), "External".to_string()));
        } else {
            let new_target = prefixed_target(&target, prefix);
            let source_part = target_part_name(&target);
            let new_part = target_part_name(&new_target);

            match source.part(&source_part) {
                Some(data) => {
                    self.package.put(&new_part, data.to_vec());
                    self.stats.media += 1;
                    self.register_content_type(&source_part, &new_part, source_types);
                }
                None => tracing::warn!(
                    "{} 引用的部件不存在: {}",
                    source.source().display(),
                    source_part
                ),
            }
            let rels_of_part = match source_part.rsplit_once('/') {
                Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
                None => format!("_rels/{}.rels", source_part),
            };
            if source.contains(&rels_of_part) {
                tracing::warn!("部件 {} 自带的关系未复制", source_part);
            }
            attrs.push(("Target".to_string(), new_target));
        }

        self.new_rels.push(XmlEvent::Empty {
            name: "Relationship".to_string(),
            attrs,
        });
        self.stats.relationships += 1;
    }

    fn register_content_type(&mut self, source_part: &str, new_part: &str, source_types: &[XmlEvent]) {
        let source_name = format!("/{}", source_part);
        let override_type = root_children_attrs(source_types, "Override")
            .into_iter()
            .find(|a| attr(a, "PartName") == Some(source_name.as_str()))
            .and_then(|a| attr(&a, "ContentType").map(str::to_string));

        if let Some(content_type) = override_type {
            let part_name = format!("/{}", new_part);
            if self.known_overrides.insert(part_name.clone()) {
                self.new_types.push(XmlEvent::Empty {
                    name: "Override".to_string(),
                    attrs: vec![
                        ("PartName".to_string(), part_name),
                        ("ContentType".to_string(), content_type),
                    ],
                });
            }
            return;
        }

        let Some((_, ext)) = new_part.rsplit_once('.') else {
            return;
        };
        let ext = ext.to_lowercase();
        if self.known_extensions.contains(&ext) {
            return;
        }

        let content_type = root_children_attrs(source_types, "Default")
            .into_iter()
            .find(|a| attr(a, "Extension").map(str::to_lowercase).as_deref() == Some(ext.as_str()))
            .and_then(|a| attr(&a, "ContentType").map(str::to_string))
            .or_else(|| detect_media_type_by_file_name(new_part).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        self.known_extensions.insert(ext.clone());
        self.new_types.push(XmlEvent::Empty {
            name: "Default".to_string(),
            attrs: vec![
                ("Extension".to_string(), ext),
                ("ContentType".to_string(), content_type),
            ],
        });
    }

    fn merge_styles(&mut self, source_styles: &[XmlEvent]) {
        if self.styles.is_none() {
            return;
        }
        let Some(root) = source_styles
            .iter()
            .position(|e| matches!(e, XmlEvent::Start { name, .. } if local_name(name) == "styles"))
        else {
            return;
        };
        let Some(end) = matching_end(source_styles, root) else {
            return;
        };

        for (s, e) in child_spans(source_styles, root, end) {
            let span = &source_styles[s..=e];
            let is_style = span[0].element_name().map(local_name) == Some("style");
            let id = match &span[0] {
                XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } => {
                    attr(attrs, "w:styleId").map(str::to_string)
                }
                _ => None,
            };
            if let (true, Some(id)) = (is_style, id) {
                if self.style_ids.insert(id) {
                    self.new_styles.extend_from_slice(span);
                    self.stats.styles_added += 1;
                }
            }
        }
    }

    fn finish(mut self) -> DocxResult<(DocxPackage, ComposeStats)> {
        let mut document = self.head;
        document.append(&mut self.children);
        if let Some(mut sect_pr) = self.sect_pr {
            document.append(&mut sect_pr);
        }
        document.append(&mut self.tail);
        self.package
            .put(DOCUMENT_PART, write_events(DOCUMENT_PART, &document)?);

        if !self.new_rels.is_empty() {
            append_to_root(&mut self.rels, self.new_rels);
            self.package
                .put(DOCUMENT_RELS_PART, write_events(DOCUMENT_RELS_PART, &self.rels)?);
        }

        if !self.new_types.is_empty() {
            append_to_root(&mut self.types, self.new_types);
            self.package
                .put(CONTENT_TYPES_PART, write_events(CONTENT_TYPES_PART, &self.types)?);
        }

        if let Some(mut styles) = self.styles {
            if !self.new_styles.is_empty() {
                append_to_root(&mut styles, self.new_styles);
                self.package
                    .put(STYLES_PART, write_events(STYLES_PART, &styles)?);
            }
        }

        Ok((self.package, self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::builder::DocxBuilder;
    use crate::docx::xml::parse_tree;

    fn document_text(path: &Path) -> (DocxPackage, String) {
        let package = DocxPackage::read(path).unwrap();
        let tree = parse_tree(DOCUMENT_PART, package.part(DOCUMENT_PART).unwrap()).unwrap();
        let text = tree.text();
        (package, text)
    }

    #[test]
    fn test_prefixed_target() {
        assert_eq!(prefixed_target("media/image1.png", "bb2_"), "media/bb2_image1.png");
        assert_eq!(prefixed_target("chart.xml", "bb1_"), "bb1_chart.xml");
    }

    #[test]
    fn test_compose_concatenates_bodies_and_renames_media() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.docx");
        let b = dir.path().join("b.docx");
        let c = dir.path().join("c.docx");
        DocxBuilder::new().heading(0, "Cover").with_section().write(&a).unwrap();
        DocxBuilder::new()
            .heading(1, "Chapter 1")
            .image("image1.png", b"\x89PNG\r\n\x1a\none")
            .hyperlink("site", "https://example.com/?a=1&b=2")
            .write(&b)
            .unwrap();
        DocxBuilder::new()
            .heading(1, "Chapter 2")
            .image("image1.png", b"\x89PNG\r\n\x1a\ntwo")
            .with_section()
            .write(&c)
            .unwrap();

        let out = dir.path().join("work/master.docx");
        let stats = compose(&[&a, &b, &c], &out).unwrap();
        assert_eq!(stats.parts, 3);
        assert_eq!(stats.media, 2);
        assert_eq!(stats.relationships, 3);

        let (package, text) = document_text(&out);
        let cover = text.find("Cover").unwrap();
        let ch1 = text.find("Chapter 1").unwrap();
        let ch2 = text.find("Chapter 2").unwrap();
        assert!(cover < ch1 && ch1 < ch2);

        assert_eq!(
            package.part("word/media/bb1_image1.png"),
            Some(&b"\x89PNG\r\n\x1a\none"[..])
        );
        assert_eq!(
            package.part("word/media/bb2_image1.png"),
            Some(&b"\x89PNG\r\n\x1a\ntwo"[..])
        );

        let rels = String::from_utf8(package.part(DOCUMENT_RELS_PART).unwrap().to_vec()).unwrap();
        assert!(rels.contains("Id=\"bb1_rId2\""));
        assert!(rels.contains("Target=\"media/bb2_image1.png\""));
        assert!(rels.contains("https://example.com/?a=1&amp;b=2"));

        let doc = String::from_utf8(package.part(DOCUMENT_PART).unwrap().to_vec()).unwrap();
        assert!(doc.contains("r:embed=\"bb1_rId2\""));
        assert!(doc.contains("r:embed=\"bb2_rId2\""));
        assert_eq!(doc.matches("<w:sectPr>").count(), 1);
    }

    /// 给片段加上引用页眉的节属性
    fn add_header(path: &Path) {
        const HEADER_TYPE: &str =
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
        let mut package = DocxPackage::read(path).unwrap();
        let patch = |package: &mut DocxPackage, part: &str, from: &str, to: &str| {
            let xml = String::from_utf8(package.part(part).unwrap().to_vec()).unwrap();
            assert!(xml.contains(from));
            package.put(part, xml.replacen(from, to, 1).into_bytes());
        };
        patch(
            &mut package,
            DOCUMENT_PART,
            "</w:body>",
            "<w:sectPr><w:headerReference w:type=\"default\" r:id=\"rId77\"/></w:sectPr></w:body>",
        );
        patch(
            &mut package,
            DOCUMENT_RELS_PART,
            "</Relationships>",
            &format!("<Relationship Id=\"rId77\" Type=\"{HEADER_TYPE}\" Target=\"header1.xml\"/></Relationships>"),
        );
        patch(
            &mut package,
            CONTENT_TYPES_PART,
            "</Types>",
            "<Override PartName=\"/word/header1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml\"/></Types>",
        );
        package.put(
            "word/header1.xml",
            b"<w:hdr xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:p><w:r><w:t>Running head</w:t></w:r></w:p></w:hdr>".to_vec(),
        );
        package.write(path).unwrap();
    }

    #[test]
    fn test_section_header_references_are_carried_over() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.docx");
        let b = dir.path().join("b.docx");
        DocxBuilder::new().paragraph("cover").write(&a).unwrap();
        DocxBuilder::new().heading(1, "Chapter 1").write(&b).unwrap();
        add_header(&b);

        let out = dir.path().join("out.docx");
        let stats = compose(&[&a, &b], &out).unwrap();
        assert_eq!(stats.relationships, 1);

        let package = DocxPackage::read(&out).unwrap();
        let doc = String::from_utf8(package.part(DOCUMENT_PART).unwrap().to_vec()).unwrap();
        assert!(doc.contains("r:id=\"bb1_rId77\""));
        assert!(!doc.contains("r:id=\"rId77\""));

        let rels = String::from_utf8(package.part(DOCUMENT_RELS_PART).unwrap().to_vec()).unwrap();
        assert!(rels.contains("Id=\"bb1_rId77\""));
        assert!(rels.contains("Target=\"bb1_header1.xml\""));
        assert!(package.part("word/bb1_header1.xml").is_some());

        let types = String::from_utf8(package.part(CONTENT_TYPES_PART).unwrap().to_vec()).unwrap();
        assert!(types.contains("PartName=\"/word/bb1_header1.xml\""));
    }

    #[test]
    fn test_content_type_added_for_new_extension() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.docx");
        let b = dir.path().join("b.docx");
        DocxBuilder::new().paragraph("cover").write(&a).unwrap();
        DocxBuilder::new()
            .image("photo.gif", b"GIF89a....")
            .write(&b)
            .unwrap();

        let out = dir.path().join("out.docx");
        compose(&[&a, &b], &out).unwrap();

        let package = DocxPackage::read(&out).unwrap();
        let types = String::from_utf8(package.part(CONTENT_TYPES_PART).unwrap().to_vec()).unwrap();
        assert!(types.contains("Extension=\"gif\" ContentType=\"image/gif\""));
    }

    #[test]
    fn test_styles_missing_from_base_are_added() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.docx");
        let other = dir.path().join("other.docx");
        DocxBuilder::new().paragraph("x").write(&base).unwrap();

        // 去掉基础文档中的 Code 样式
        let mut package = DocxPackage::read(&base).unwrap();
        let styles = String::from_utf8(package.part(STYLES_PART).unwrap().to_vec()).unwrap();
        let start = styles.find("<w:style w:type=\"paragraph\" w:styleId=\"Code\">").unwrap();
        let end = start + styles[start..].find("</w:style>").unwrap() + "</w:style>".len();
        let trimmed = format!("{}{}", &styles[..start], &styles[end..]);
        package.put(STYLES_PART, trimmed.into_bytes());
        package.write(&base).unwrap();

        DocxBuilder::new().code_block("print(1)").write(&other).unwrap();

        let out = dir.path().join("out.docx");
        let stats = compose(&[&base, &other], &out).unwrap();
        assert_eq!(stats.styles_added, 1);

        let merged = DocxPackage::read(&out).unwrap();
        let styles = String::from_utf8(merged.part(STYLES_PART).unwrap().to_vec()).unwrap();
        assert!(styles.contains("w:styleId=\"Code\""));
    }

    #[test]
    fn test_merge_in_order_generates_cover() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = dir.path().join("Chapter 1.docx");
        DocxBuilder::new().heading(1, "Chapter 1").write(&chapter).unwrap();

        let master = dir.path().join("work/master_en.docx");
        let cover_text = CoverText {
            title: "Agentic Design Patterns".into(),
            subtitle: "Korean Edition (Auto-compiled)".into(),
        };
        let outcome = merge_in_order(
            &[&chapter],
            &master,
            Some(&dir.path().join("assets/cover.docx")),
            Some(&dir.path().join("assets/toc.docx")),
            &cover_text,
        )
        .unwrap();

        assert!(outcome.insert_auto_toc);
        assert!(dir.path().join("work").join(AUTO_COVER_NAME).is_file());
        let (_, text) = document_text(&master);
        assert!(text.starts_with("Agentic Design Patterns"));
        assert!(text.contains("Chapter 1"));
    }

    #[test]
    fn test_merge_in_order_uses_supplied_toc() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.docx");
        let toc = dir.path().join("toc.docx");
        let chapter = dir.path().join("ch.docx");
        DocxBuilder::new().paragraph("My Cover").write(&cover).unwrap();
        DocxBuilder::new().paragraph("My Contents").write(&toc).unwrap();
        DocxBuilder::new().paragraph("Body").write(&chapter).unwrap();

        let master = dir.path().join("master.docx");
        let cover_text = CoverText {
            title: "unused".into(),
            subtitle: "unused".into(),
        };
        let outcome =
            merge_in_order(&[&chapter], &master, Some(&cover), Some(&toc), &cover_text).unwrap();

        assert!(!outcome.insert_auto_toc);
        assert_eq!(outcome.stats.parts, 3);
        let (_, text) = document_text(&master);
        assert_eq!(text, "My CoverMy ContentsBody");
    }

    #[test]
    fn test_compose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let parts: [&Path; 0] = [];
        let err = compose(&parts, &dir.path().join("x.docx")).unwrap_err();
        assert!(matches!(err, DocxError::NothingToCompose));
    }
}
