use std::io;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, NodeOrText, QualName, TreeSink};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> io::Result<RcDom> {
    let s = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 按文档顺序查找所有指定名称的元素
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    collect_nodes(node, node_names, &mut found_nodes);
    found_nodes
}

fn collect_nodes(node: &Handle, node_names: &[&str], found_nodes: &mut Vec<Handle>) {
    if let NodeData::Element { ref name, .. } = node.data {
        if node_names.contains(&&*name.local) {
            found_nodes.push(node.clone());
        }
    }

    for child_node in node.children.borrow().iter() {
        collect_nodes(child_node, node_names, found_nodes);
    }
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取 `<body>` 元素
pub fn get_body(dom: &RcDom) -> Option<Handle> {
    get_child_node_by_name(&dom.document, "html")
        .and_then(|html| get_child_node_by_name(&html, "body"))
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 拼接节点下所有文本
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    push_text(node, &mut text);
    text
}

fn push_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                push_text(child, out);
            }
        }
    }
}

/// 创建带属性的元素
pub fn new_element(dom: &RcDom, tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    create_element(dom, QualName::new(None, ns!(), LocalName::from(tag)), attrs)
}

/// 追加子节点
pub fn append_child(dom: &RcDom, parent: &Handle, child: Handle) {
    dom.append(parent, NodeOrText::AppendNode(child));
}

/// 追加文本，与相邻文本节点合并
pub fn append_text(dom: &RcDom, parent: &Handle, text: &str) {
    dom.append(parent, NodeOrText::AppendText(StrTendril::from_slice(text)));
}

/// 插入为第一个子节点
pub fn prepend_child(dom: &RcDom, parent: &Handle, child: Handle) {
    let first = parent.children.borrow().first().cloned();
    match first {
        Some(first) => dom.append_before_sibling(&first, NodeOrText::AppendNode(child)),
        None => append_child(dom, parent, child),
    }
}

/// 设置节点属性，`None` 表示删除
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let existing = attrs_mut
            .iter()
            .position(|attr| &*attr.name.local == attr_name);

        match (existing, attr_value) {
            (Some(i), Some(value)) => {
                attrs_mut[i].value.clear();
                attrs_mut[i].value.push_slice(&value);
            }
            (Some(i), None) => {
                attrs_mut.remove(i);
            }
            (None, Some(value)) => attrs_mut.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: format_tendril!("{}", value),
            }),
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nodes_in_document_order() {
        let dom = html_to_dom(
            b"<h1>One</h1><p>x</p><h2>Two</h2><h1>Three</h1>",
            "utf-8",
        )
        .unwrap();
        let headings: Vec<String> = find_nodes(&dom.document, &["h1", "h2"])
            .iter()
            .map(text_content)
            .collect();
        assert_eq!(headings, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_set_and_remove_attr() {
        let dom = html_to_dom(b"<p id=\"a\">x</p>", "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);

        set_node_attr(&p, "id", Some("b".to_string()));
        set_node_attr(&p, "class", Some("lead".to_string()));
        assert_eq!(get_node_attr(&p, "id").as_deref(), Some("b"));
        assert_eq!(get_node_attr(&p, "class").as_deref(), Some("lead"));

        set_node_attr(&p, "id", None);
        assert_eq!(get_node_attr(&p, "id"), None);
    }

    #[test]
    fn test_prepend_and_append() {
        let dom = html_to_dom(b"<p>first</p>", "utf-8").unwrap();
        let body = get_body(&dom).unwrap();

        let div = new_element(&dom, "div", &[("class", "box")]);
        append_text(&dom, &div, "hello");
        prepend_child(&dom, &body, div);

        let children = body.children.borrow();
        assert_eq!(get_node_name(&children[0]), Some("div"));
        assert_eq!(text_content(&children[0]), "hello");
        assert_eq!(get_node_name(&children[1]), Some("p"));
    }

    #[test]
    fn test_legacy_encoding() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode("<p>caf\u{e9}</p>");
        let dom = html_to_dom(&bytes, "windows-1252").unwrap();
        let body = get_body(&dom).unwrap();
        assert_eq!(text_content(&body), "caf\u{e9}");
    }
}
