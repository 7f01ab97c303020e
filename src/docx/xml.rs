//! WordprocessingML 部件
//!
//! 两种表示：
//! - 事件流 ([`XmlEvent`])：无损往返，合并时在事件层面拼接和改写；
//! - 元素树 ([`XmlElement`])：只读，转换 HTML 时使用。
//!
//! 属性值保存为原始（已转义）字节，写回时不再转义，这样 `&#13;&#10;` 之类的字符引用
//! 能原样保留。读取属性用 [`XmlElement::attr`]，它会反转义。

use std::borrow::Cow;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

use super::{DocxError, DocxResult};

#[derive(Clone, Debug, PartialEq)]
pub enum XmlEvent {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    PI {
        content: String,
    },
    DocType {
        text: String,
    },
}

impl XmlEvent {
    /// 开始标签或空标签的名称
    pub fn element_name(&self) -> Option<&str> {
        match self {
            XmlEvent::Start { name, .. } | XmlEvent::Empty { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self) -> Option<&mut Vec<(String, String)>> {
        match self {
            XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

/// 去掉命名空间前缀
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// 转义文本，可用于文本节点和属性值
pub fn escape_text(text: &str) -> Cow<'_, str> {
    escape(text)
}

/// 解析为事件流
pub fn parse_events(part: &str, xml_bytes: &[u8]) -> DocxResult<Vec<XmlEvent>> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let err = |e: quick_xml::Error| DocxError::xml(part, e);
    let mut events = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(err)? {
            Event::Eof => break,
            Event::Decl(d) => {
                let version = bytes_to_string(d.version().map_err(err)?);
                let encoding = d.encoding().and_then(|r| r.ok()).map(bytes_to_string);
                let standalone = d.standalone().and_then(|r| r.ok()).map(bytes_to_string);
                events.push(XmlEvent::Decl {
                    version,
                    encoding,
                    standalone,
                });
            }
            Event::Start(s) => events.push(XmlEvent::Start {
                name: bytes_to_string(s.name().as_ref()),
                attrs: collect_attrs(part, &s)?,
            }),
            Event::End(e) => events.push(XmlEvent::End {
                name: bytes_to_string(e.name().as_ref()),
            }),
            Event::Empty(s) => events.push(XmlEvent::Empty {
                name: bytes_to_string(s.name().as_ref()),
                attrs: collect_attrs(part, &s)?,
            }),
            Event::Text(t) => events.push(XmlEvent::Text {
                text: t.unescape().map_err(err)?.into_owned(),
            }),
            Event::CData(t) => events.push(XmlEvent::CData {
                text: bytes_to_string(t.into_inner()),
            }),
            Event::Comment(t) => events.push(XmlEvent::Comment {
                text: bytes_to_string(t.into_inner()),
            }),
            Event::PI(t) => events.push(XmlEvent::PI {
                content: format!(
                    "{}{}",
                    bytes_to_string(t.target()),
                    bytes_to_string(t.content())
                ),
            }),
            Event::DocType(t) => events.push(XmlEvent::DocType {
                text: bytes_to_string(t.into_inner()),
            }),
        }
    }

    Ok(events)
}

fn collect_attrs(part: &str, s: &BytesStart<'_>) -> DocxResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for a in s.attributes() {
        let a = a.map_err(|e| DocxError::xml(part, e))?;
        attrs.push((
            bytes_to_string(a.key.as_ref()),
            bytes_to_string(a.value.as_ref()),
        ));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

/// 事件流写回字节
pub fn write_events(part: &str, events: &[XmlEvent]) -> DocxResult<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();

    fn write_start_like(out: &mut Vec<u8>, name: &str, attrs: &[(String, String)], empty: bool) {
        out.push(b'<');
        out.extend_from_slice(name.as_bytes());
        for (k, v) in attrs {
            out.push(b' ');
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(b"=\"");
            out.extend_from_slice(v.as_bytes());
            out.push(b'"');
        }
        out.extend_from_slice(if empty { &b"/>"[..] } else { &b">"[..] });
    }

    for ev in events {
        match ev {
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => {
                let decl =
                    BytesDecl::new(version.as_str(), encoding.as_deref(), standalone.as_deref());
                let mut writer = quick_xml::Writer::new(Vec::new());
                writer
                    .write_event(Event::Decl(decl))
                    .map_err(|e| DocxError::xml(part, e))?;
                out.extend_from_slice(&writer.into_inner());
            }
            XmlEvent::Start { name, attrs } => write_start_like(&mut out, name, attrs, false),
            XmlEvent::Empty { name, attrs } => write_start_like(&mut out, name, attrs, true),
            XmlEvent::End { name } => {
                out.extend_from_slice(b"</");
                out.extend_from_slice(name.as_bytes());
                out.push(b'>');
            }
            XmlEvent::Text { text } => {
                for ch in text.chars() {
                    match ch {
                        '&' => out.extend_from_slice(b"&amp;"),
                        '<' => out.extend_from_slice(b"&lt;"),
                        '>' => out.extend_from_slice(b"&gt;"),
                        _ => {
                            let mut buf = [0u8; 4];
                            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                    }
                }
            }
            XmlEvent::CData { text } => {
                out.extend_from_slice(b"<![CDATA[");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"]]>");
            }
            XmlEvent::Comment { text } => {
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"-->");
            }
            XmlEvent::PI { content } => {
                out.extend_from_slice(b"<?");
                out.extend_from_slice(content.as_bytes());
                out.extend_from_slice(b"?>");
            }
            XmlEvent::DocType { text } => {
                out.extend_from_slice(b"<!DOCTYPE");
                out.extend_from_slice(text.as_bytes());
                out.push(b'>');
            }
        }
    }

    Ok(out)
}

/// 找到 `start` 处开始标签对应的结束标签下标；空标签返回自身
pub fn matching_end(events: &[XmlEvent], start: usize) -> Option<usize> {
    match events.get(start)? {
        XmlEvent::Empty { .. } => return Some(start),
        XmlEvent::Start { .. } => {}
        _ => return None,
    }

    let mut depth = 0usize;
    for (i, ev) in events.iter().enumerate().skip(start) {
        match ev {
            XmlEvent::Start { .. } => depth += 1,
            XmlEvent::End { .. } => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// 第一个本地名为 `local` 的开始标签
pub fn find_start(events: &[XmlEvent], local: &str) -> Option<usize> {
    events.iter().position(|ev| {
        matches!(ev, XmlEvent::Start { name, .. } if local_name(name) == local)
    })
}

/// 元素的直接子元素范围 `(开始, 结束)`，两端均包含；元素之间的文本忽略
pub fn child_spans(events: &[XmlEvent], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut i = start + 1;
    while i < end {
        match matching_end(events, i) {
            Some(j) if j < end => {
                spans.push((i, j));
                i = j + 1;
            }
            _ => i += 1,
        }
    }
    spans
}

// ============================================================================
// 元素树
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// 读取属性并反转义；先按完整名称匹配，再按本地名匹配
    pub fn attr(&self, name: &str) -> Option<String> {
        let wanted = local_name(name);
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| self.attrs.iter().find(|(k, _)| local_name(k) == wanted))
            .map(|(_, v)| unescape(v).map(Cow::into_owned).unwrap_or_else(|_| v.clone()))
    }

    /// 直接子元素
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// 深度优先查找第一个后代元素
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find(local) {
                return Some(found);
            }
        }
        None
    }

    /// 所有后代文本
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.push_text(out),
            }
        }
    }
}

/// 解析为元素树，返回根元素
pub fn parse_tree(part: &str, xml_bytes: &[u8]) -> DocxResult<XmlElement> {
    let events = parse_events(part, xml_bytes)?;
    let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

    for ev in events {
        match ev {
            XmlEvent::Start { name, attrs } => stack.push(XmlElement {
                name,
                attrs,
                children: Vec::new(),
            }),
            XmlEvent::Empty { name, attrs } => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Element(XmlElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    }));
                }
            }
            XmlEvent::End { .. } => {
                if stack.len() < 2 {
                    return Err(DocxError::xml(part, "unbalanced end tag"));
                }
                if let Some(done) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(done));
                    }
                }
            }
            XmlEvent::Text { text } | XmlEvent::CData { text } => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(DocxError::xml(part, "unclosed element"));
    }
    stack
        .pop()
        .and_then(|doc| {
            doc.children.into_iter().find_map(|c| match c {
                XmlNode::Element(e) => Some(e),
                XmlNode::Text(_) => None,
            })
        })
        .ok_or_else(|| DocxError::xml(part, "no root element"))
}
