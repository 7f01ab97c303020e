//! 自动目录
//!
//! 没有提供 `toc.docx` 时，按 `h1`/`h2` 生成一个链接列表放在正文最前面。

use markup5ever_rcdom::RcDom;

use crate::parsers::html::{
    append_child, append_text, find_nodes, get_body, get_node_attr, new_element, prepend_child,
    set_node_attr, text_content,
};

/// 目录标题
pub const TOC_HEADING: &str = "Contents";

/// 目录容器的 class
pub const TOC_CLASS: &str = "auto-toc";

/// 链接文字的最大字符数
pub const MAX_LINK_CHARS: usize = 200;

/// 插入自动目录，返回条目数；没有标题时不做任何修改
pub fn insert_auto_toc(dom: &RcDom) -> usize {
    let Some(body) = get_body(dom) else {
        tracing::warn!("文档没有 body，跳过自动目录");
        return 0;
    };

    let headings = find_nodes(&body, &["h1", "h2"]);
    if headings.is_empty() {
        tracing::info!("没有 h1/h2 标题，跳过自动目录");
        return 0;
    }

    let list = new_element(dom, "ol", &[]);
    for (i, heading) in headings.iter().enumerate() {
        let id = match get_node_attr(heading, "id").filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let id = format!("h{}", i + 1);
                set_node_attr(heading, "id", Some(id.clone()));
                id
            }
        };

        let text: String = text_content(heading)
            .trim()
            .chars()
            .take(MAX_LINK_CHARS)
            .collect();

        let item = new_element(dom, "li", &[]);
        let link = new_element(dom, "a", &[("href", &format!("#{}", id))]);
        append_text(dom, &link, &text);
        append_child(dom, &item, link);
        append_child(dom, &list, item);
    }

    let container = new_element(dom, "div", &[("class", TOC_CLASS)]);
    let title = new_element(dom, "h1", &[]);
    append_text(dom, &title, TOC_HEADING);
    append_child(dom, &container, title);
    append_child(dom, &container, list);
    prepend_child(dom, &body, container);

    tracing::info!("已插入自动目录 ({} 项)", headings.len());
    headings.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::{html_to_dom, serialize_document};

    fn render(html: &str) -> (usize, String) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let count = insert_auto_toc(&dom);
        let out = String::from_utf8(serialize_document(&dom).unwrap()).unwrap();
        (count, out)
    }

    #[test]
    fn test_lists_headings_in_order_numbered_from_one() {
        let (count, out) = render(
            "<html><body><h1>Part One</h1><p>x</p><h2 id=\"setup\"> Setup </h2><h3>Skip</h3><h1>Part Two</h1></body></html>",
        );

        assert_eq!(count, 3);
        assert!(out.contains(
            "<body><div class=\"auto-toc\"><h1>Contents</h1><ol>\
             <li><a href=\"#h1\">Part One</a></li>\
             <li><a href=\"#setup\">Setup</a></li>\
             <li><a href=\"#h3\">Part Two</a></li></ol></div>"
        ));
        assert!(out.contains("<h1 id=\"h1\">Part One</h1>"));
        assert!(out.contains("<h2 id=\"setup\"> Setup </h2>"));
        assert!(out.contains("<h1 id=\"h3\">Part Two</h1>"));
        assert!(!out.contains("id=\"h0\""));
        assert!(!out.contains("Skip</a>"));
    }

    #[test]
    fn test_no_headings_no_toc() {
        let (count, out) = render("<html><body><p>only text</p></body></html>");
        assert_eq!(count, 0);
        assert!(!out.contains("auto-toc"));
    }

    #[test]
    fn test_link_text_truncated() {
        let long = "a".repeat(250);
        let (_, out) = render(&format!("<html><body><h1>{}</h1></body></html>", long));
        assert!(out.contains(&format!("<a href=\"#h1\">{}</a>", "a".repeat(200))));
    }

    #[test]
    fn test_markup_in_heading_is_flattened() {
        let (_, out) = render("<html><body><h2>Use <code>run()</code> &amp; go</h2></body></html>");
        assert!(out.contains("<a href=\"#h1\">Use run() &amp; go</a>"));
    }
}
