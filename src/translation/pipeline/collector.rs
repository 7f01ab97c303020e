//! 文本收集器模块
//!
//! 深度优先、按文档顺序遍历 DOM，为每个文本节点构造上下文并交给分类器判定，
//! 收集需要翻译的节点。遍历过程中不修改 DOM。

use markup5ever_rcdom::{Handle, NodeData};

use super::filters::{FilterStats, SkipReason, TextClassifier};
use crate::parsers::css::declared_font_family;

/// 文本节点在树中的上下文
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeContext {
    /// 祖先元素标签名（小写），由外到内
    pub ancestors: Vec<String>,
    /// 所有祖先元素的类名
    pub classes: Vec<String>,
    /// 最近一个带 `style` 属性的祖先声明的 `font-family`（小写）；该祖先没有声明时为 `None`
    pub font_family: Option<String>,
    /// 是否位于 `td`/`th` 之内
    pub in_table_cell: bool,
}

impl NodeContext {
    /// 祖先中是否出现任一指定标签
    pub fn has_ancestor(&self, tags: &[&str]) -> bool {
        self.ancestors.iter().any(|tag| tags.contains(&tag.as_str()))
    }

    /// 直接父元素标签名
    pub fn parent_tag(&self) -> Option<&str> {
        self.ancestors.last().map(String::as_str)
    }
}

/// 需要翻译的文本节点
#[derive(Debug, Clone)]
pub struct TextItem {
    /// DOM节点引用
    pub node: Handle,
    /// 节点原始文本（含首尾空白）
    pub original: String,
    /// 去除首尾空白后的文本，也是翻译记忆的键
    pub text: String,
    pub context: NodeContext,
}

impl TextItem {
    /// 获取文本字符数
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// 收集统计
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub elements_visited: usize,
    pub text_nodes: usize,
    pub filter: FilterStats,
}

impl CollectionStats {
    pub fn total_translatable(&self) -> usize {
        self.filter.translatable_texts
    }

    pub fn total_skipped(&self) -> usize {
        self.filter.filtered_out
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.filter.by_reason.get(&reason).copied().unwrap_or(0)
    }
}

struct Frame {
    tag: String,
    classes: Vec<String>,
    styled: bool,
    font_family: Option<String>,
}

/// 文本收集器
#[derive(Default)]
pub struct TextCollector {
    stats: CollectionStats,
}

impl TextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集 `root` 下所有需要翻译的文本节点
    pub fn collect(&mut self, root: &Handle, classifier: &dyn TextClassifier) -> Vec<TextItem> {
        let mut items = Vec::new();
        let mut stack = Vec::new();
        self.walk(root, &mut stack, classifier, &mut items);

        tracing::debug!(
            "文本收集完成: {} 个文本节点, {} 个需要翻译 ({:.1}%), {} 个跳过",
            self.stats.text_nodes,
            self.stats.total_translatable(),
            self.stats.filter.translatability_rate() * 100.0,
            self.stats.total_skipped()
        );
        items
    }

    fn walk(
        &mut self,
        node: &Handle,
        stack: &mut Vec<Frame>,
        classifier: &dyn TextClassifier,
        items: &mut Vec<TextItem>,
    ) {
        match &node.data {
            NodeData::Element { name, attrs, .. } => {
                self.stats.elements_visited += 1;

                let (classes, styled, font_family) = {
                    let attrs = attrs.borrow();
                    let attr = |key: &str| {
                        attrs
                            .iter()
                            .find(|a| &*a.name.local == key)
                            .map(|a| a.value.to_string())
                    };
                    let classes = attr("class")
                        .map(|c| c.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_default();
                    let style = attr("style");
                    let font_family = style.as_deref().and_then(declared_font_family);
                    (classes, style.is_some(), font_family)
                };

                stack.push(Frame {
                    tag: name.local.to_ascii_lowercase().to_string(),
                    classes,
                    styled,
                    font_family,
                });
                for child in node.children.borrow().iter() {
                    self.walk(child, stack, classifier, items);
                }
                stack.pop();
            }
            NodeData::Text { contents } => {
                self.stats.text_nodes += 1;

                let original = contents.borrow().to_string();
                let context = Self::context_from(stack);
                let analysis = classifier.analyze(&original, &context);
                let reason = analysis.skip_reason;
                if let Some(reason) = reason {
                    tracing::trace!(
                        "跳过 {:?}: {:?} (特征 {:?}, 符号比例 {:.2})",
                        analysis.trimmed_text,
                        reason,
                        analysis.matched_pattern,
                        analysis.symbol_ratio
                    );
                }
                self.stats.filter.record(reason);

                if reason.is_none() {
                    items.push(TextItem {
                        node: node.clone(),
                        text: original.trim().to_string(),
                        original,
                        context,
                    });
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    self.walk(child, stack, classifier, items);
                }
            }
        }
    }

    fn context_from(stack: &[Frame]) -> NodeContext {
        NodeContext {
            ancestors: stack.iter().map(|f| f.tag.clone()).collect(),
            classes: stack.iter().flat_map(|f| f.classes.iter().cloned()).collect(),
            font_family: stack
                .iter()
                .rev()
                .find(|f| f.styled)
                .and_then(|f| f.font_family.clone()),
            in_table_cell: stack.iter().any(|f| f.tag == "td" || f.tag == "th"),
        }
    }

    pub fn get_stats(&self) -> &CollectionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;
    use crate::translation::pipeline::filters::HeuristicClassifier;

    fn collect(html: &str) -> (Vec<TextItem>, CollectionStats) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let mut collector = TextCollector::new();
        let items = collector.collect(&dom.document, &HeuristicClassifier::default());
        (items, collector.get_stats().clone())
    }

    #[test]
    fn test_collects_prose_in_document_order() {
        let (items, _) = collect(
            "<h1>Prompt Chaining</h1><p>The agent plans its next action.</p>\
             <p>Each step feeds the next one.</p>",
        );
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Prompt Chaining",
                "The agent plans its next action.",
                "Each step feeds the next one."
            ]
        );
    }

    #[test]
    fn test_context_tracks_ancestors() {
        let (items, stats) = collect(
            "<table><tr><td><span style=\"font-family: Georgia\">Hello there</span></td></tr></table>\
             <pre class=\"code\">import numpy as np</pre>",
        );
        assert_eq!(items.len(), 1);

        let ctx = &items[0].context;
        assert!(ctx.in_table_cell);
        assert_eq!(ctx.parent_tag(), Some("span"));
        assert_eq!(ctx.font_family.as_deref(), Some("georgia"));
        assert_eq!(stats.skipped_for(SkipReason::VerbatimElement), 1);
    }

    #[test]
    fn test_nearest_font_family_wins() {
        let (items, stats) = collect(
            "<div style=\"font-family: Courier New\"><span style=\"font-family: Georgia\">\
             Serif text inside a monospace block.</span> Plain monospace text here.</div>",
        );
        assert_eq!(items.len(), 1);
        assert!(items[0].text.starts_with("Serif"));
        assert_eq!(stats.skipped_for(SkipReason::MonospaceFont), 1);
    }

    #[test]
    fn test_translatability_rate() {
        let (items, stats) =
            collect("<p>The agent plans its next action.</p><p>import numpy as np</p>");
        assert_eq!(items.len(), 1);
        assert_eq!(stats.text_nodes, 2);
        assert_eq!(stats.skipped_for(SkipReason::CodePattern), 1);
        assert!((stats.filter.translatability_rate() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_nearest_styled_ancestor_decides() {
        let (items, stats) = collect(
            "<div style=\"font-family: Courier\"><span style=\"color: red\">\
             Run the planner before the executor.</span></div>",
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].context.font_family, None);
        assert_eq!(stats.skipped_for(SkipReason::MonospaceFont), 0);
    }

    #[test]
    fn test_keeps_original_whitespace() {
        let (items, _) = collect("<p>  Leading and trailing space.  </p>");
        assert_eq!(items[0].original, "  Leading and trailing space.  ");
        assert_eq!(items[0].text, "Leading and trailing space.");
    }
}
