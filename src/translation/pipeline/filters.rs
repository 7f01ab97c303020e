//! 文本过滤器模块
//!
//! 判断 DOM 中的文本节点是自然语言（需要翻译）还是代码、命令等需要原样保留的内容。
//! 判定只依赖文本本身和它在树中的上下文，结果确定且无副作用。

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::collector::NodeContext;
use crate::translation::config::constants;

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 空白文本
    Empty,
    /// 去除空白后过短
    TooShort,
    /// 位于 code/pre/kbd/samp 之内
    VerbatimElement,
    /// 位于 script/style 等不承载正文的元素之内
    NonContentElement,
    /// 祖先带有代码高亮类名
    CodeClass,
    /// 祖先声明了等宽字体
    MonospaceFont,
    /// 表格单元格中的代码
    CodeInTable,
    /// 命中代码特征正则
    CodePattern,
    /// 符号密度过高
    SymbolDensity,
    /// 已经是目标语言
    AlreadyTarget,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::TooShort => "too-short",
            SkipReason::VerbatimElement => "verbatim-element",
            SkipReason::NonContentElement => "non-content-element",
            SkipReason::CodeClass => "code-class",
            SkipReason::MonospaceFont => "monospace-font",
            SkipReason::CodeInTable => "code-in-table",
            SkipReason::CodePattern => "code-pattern",
            SkipReason::SymbolDensity => "symbol-density",
            SkipReason::AlreadyTarget => "already-target",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文本分类器
///
/// 可替换的判定接口，翻译服务通过 `Box<dyn TextClassifier>` 使用它。
pub trait TextClassifier {
    /// 返回跳过原因；`None` 表示需要翻译
    fn skip_reason(&self, text: &str, ctx: &NodeContext) -> Option<SkipReason>;

    fn should_skip(&self, text: &str, ctx: &NodeContext) -> bool {
        self.skip_reason(text, ctx).is_some()
    }

    /// 完整分析，附带命中的代码特征和符号比例
    fn analyze(&self, text: &str, ctx: &NodeContext) -> TextAnalysis {
        let trimmed = text.trim();
        TextAnalysis {
            trimmed_text: trimmed.to_string(),
            char_count: trimmed.chars().count(),
            skip_reason: self.skip_reason(text, ctx),
            matched_pattern: matched_code_pattern(trimmed),
            symbol_ratio: symbol_ratio(trimmed),
        }
    }
}

/// 基于规则的分类器
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    /// 等宽字体名称（小写）
    monospace_fonts: Vec<String>,
    /// 目标语言，用于识别已翻译文本
    target_lang: String,
    min_length: usize,
    density_min_length: usize,
    density_threshold: f32,
    target_threshold: f32,
}

impl HeuristicClassifier {
    /// 创建新的分类器
    pub fn new(target_lang: &str) -> Self {
        Self {
            monospace_fonts: constants::MONOSPACE_FONTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            target_lang: target_lang.to_ascii_lowercase(),
            min_length: constants::MAX_SKIPPED_LENGTH,
            density_min_length: constants::DENSITY_MIN_LENGTH,
            density_threshold: constants::SPECIAL_CHAR_THRESHOLD,
            target_threshold: constants::TARGET_SCRIPT_THRESHOLD,
        }
    }

    /// 追加等宽字体名称
    pub fn with_monospace_font(mut self, font: &str) -> Self {
        self.monospace_fonts.push(font.trim().to_lowercase());
        self
    }

    fn has_code_class(ctx: &NodeContext) -> bool {
        ctx.classes.iter().any(|class| {
            let class = class.to_ascii_lowercase();
            constants::CODE_CLASSES.contains(&class.as_str())
                || constants::CODE_CLASS_PREFIXES
                    .iter()
                    .any(|prefix| class.starts_with(prefix))
        })
    }

    fn is_monospace(&self, ctx: &NodeContext) -> bool {
        match &ctx.font_family {
            Some(families) => self
                .monospace_fonts
                .iter()
                .any(|font| families.contains(font.as_str())),
            None => false,
        }
    }

    /// 检查是否已经是目标语言
    pub fn is_already_target(&self, text: &str) -> bool {
        let total = text.chars().filter(|c| !c.is_whitespace()).count();
        if total == 0 {
            return false;
        }

        let in_script = text
            .chars()
            .filter(|&c| match self.target_lang.as_str() {
                "ko" => is_hangul(c),
                "zh" => ('\u{4e00}'..='\u{9fff}').contains(&c),
                "ja" => {
                    ('\u{3040}'..='\u{309f}').contains(&c) || ('\u{30a0}'..='\u{30ff}').contains(&c)
                }
                _ => false,
            })
            .count();

        in_script as f32 / total as f32 > self.target_threshold
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(constants::DEFAULT_TARGET_LANG)
    }
}

impl TextClassifier for HeuristicClassifier {
    fn skip_reason(&self, text: &str, ctx: &NodeContext) -> Option<SkipReason> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Some(SkipReason::Empty);
        }

        if trimmed.chars().count() <= self.min_length {
            return Some(SkipReason::TooShort);
        }

        if ctx.has_ancestor(constants::VERBATIM_ELEMENTS) {
            return Some(SkipReason::VerbatimElement);
        }

        if ctx.has_ancestor(constants::NON_CONTENT_ELEMENTS) {
            return Some(SkipReason::NonContentElement);
        }

        if Self::has_code_class(ctx) {
            return Some(SkipReason::CodeClass);
        }

        if self.is_monospace(ctx) {
            return Some(SkipReason::MonospaceFont);
        }

        if ctx.in_table_cell && is_code_like(trimmed) {
            return Some(SkipReason::CodeInTable);
        }

        if matched_code_pattern(trimmed).is_some() {
            return Some(SkipReason::CodePattern);
        }

        if is_symbol_dense(trimmed, self.density_min_length, self.density_threshold) {
            return Some(SkipReason::SymbolDensity);
        }

        if self.is_already_target(trimmed) {
            return Some(SkipReason::AlreadyTarget);
        }

        None
    }
}

/// 文本分析结果
#[derive(Debug, Clone)]
pub struct TextAnalysis {
    pub trimmed_text: String,
    pub char_count: usize,
    pub skip_reason: Option<SkipReason>,
    /// 命中的代码特征名称
    pub matched_pattern: Option<&'static str>,
    pub symbol_ratio: f32,
}

impl TextAnalysis {
    pub fn should_translate(&self) -> bool {
        self.skip_reason.is_none()
    }
}

/// 代码特征正则，按顺序匹配
const CODE_SIGNATURES: &[(&str, &str)] = &[
    ("leading-bracket", r"^\s*[{}\[\]();]"),
    ("function-call", r"^\s*[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*\("),
    ("method-access", r"^[A-Za-z_]\w*\.[A-Za-z_]\w+"),
    ("key-value", r#"^\s*["']?[a-z_][\w-]*["']?\s*[:=]\s*"#),
    ("env-assignment", r"^\s*[A-Z_][A-Z0-9_]*\s*="),
    ("shell", r"^\s*\$\s*\w+"),
    ("shell-variable", r"\$\{[A-Za-z_]\w*\}"),
    ("import", r"(?m)^\s*import\s+[\w.]+"),
    ("from-import", r"(?m)^\s*from\s+[\w.]+\s+import\b"),
    ("def", r"(?m)^\s*def\s+\w+\s*\("),
    ("class", r"(?m)^\s*class\s+\w+\s*[(:]"),
    ("hash-comment", r"^\s*#\s"),
    ("line-comment", r"^\s*//"),
    ("doc-comment", r"^\s*\*\s"),
    ("html-comment", r"^\s*<!--"),
    ("tag-pair", r"^\s*<[^>]+>.*</[^>]+>\s*$"),
];

fn code_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CODE_SIGNATURES
            .iter()
            .filter_map(|(name, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((*name, re)),
                Err(e) => {
                    tracing::error!("代码特征正则无效 {}: {}", name, e);
                    None
                }
            })
            .collect()
    })
}

/// 返回首个命中的代码特征名称
pub fn matched_code_pattern(text: &str) -> Option<&'static str> {
    code_patterns()
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

/// 代码符号所占比例（按字符计）
pub fn symbol_ratio(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let special = text
        .chars()
        .filter(|c| constants::CODE_SYMBOLS.contains(c))
        .count();
    special as f32 / total as f32
}

fn is_symbol_dense(text: &str, min_length: usize, threshold: f32) -> bool {
    text.chars().count() > min_length && symbol_ratio(text) > threshold
}

/// 检查文本是否像代码：命中任一特征正则，或符号密度过高
pub fn is_code_like(text: &str) -> bool {
    let trimmed = text.trim();
    matched_code_pattern(trimmed).is_some()
        || is_symbol_dense(
            trimmed,
            constants::DENSITY_MIN_LENGTH,
            constants::SPECIAL_CHAR_THRESHOLD,
        )
}

fn is_hangul(c: char) -> bool {
    ('\u{ac00}'..='\u{d7af}').contains(&c)
        || ('\u{1100}'..='\u{11ff}').contains(&c)
        || ('\u{3130}'..='\u{318f}').contains(&c)
}

/// 文本过滤统计
#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub total_texts: usize,
    pub translatable_texts: usize,
    pub filtered_out: usize,
    pub by_reason: HashMap<SkipReason, usize>,
}

impl FilterStats {
    /// 记录过滤结果
    pub fn record(&mut self, reason: Option<SkipReason>) {
        self.total_texts += 1;

        match reason {
            None => self.translatable_texts += 1,
            Some(reason) => {
                self.filtered_out += 1;
                *self.by_reason.entry(reason).or_insert(0) += 1;
            }
        }
    }

    /// 获取翻译率
    pub fn translatability_rate(&self) -> f32 {
        if self.total_texts == 0 {
            0.0
        } else {
            self.translatable_texts as f32 / self.total_texts as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> NodeContext {
        NodeContext::default()
    }

    fn inside(tags: &[&str]) -> NodeContext {
        NodeContext {
            ancestors: tags.iter().map(|t| t.to_string()).collect(),
            in_table_cell: tags.iter().any(|t| *t == "td" || *t == "th"),
            ..NodeContext::default()
        }
    }

    #[test]
    fn test_prose_is_translated() {
        let classifier = HeuristicClassifier::default();
        assert_eq!(
            classifier.skip_reason("The agent plans its next action.", &plain()),
            None
        );
        assert!(!classifier.should_skip("Note: agents can call tools.", &plain()));
    }

    #[test]
    fn test_short_and_empty_text() {
        let classifier = HeuristicClassifier::default();
        assert_eq!(classifier.skip_reason("   ", &plain()), Some(SkipReason::Empty));
        assert_eq!(classifier.skip_reason(" a= ", &plain()), Some(SkipReason::TooShort));
        assert_eq!(classifier.skip_reason("OK", &plain()), Some(SkipReason::TooShort));
    }

    #[test]
    fn test_code_signatures() {
        let cases = [
            ("import numpy as np", "import"),
            ("from langchain.agents import AgentExecutor", "from-import"),
            ("def plan(state):", "def"),
            ("print(\"hello\")", "function-call"),
            ("agent.invoke", "method-access"),
            ("model_name: gpt-4o", "key-value"),
            ("OPENAI_API_KEY=sk-123", "env-assignment"),
            ("$ pip install crewai", "shell"),
            ("# Initialize the agent", "hash-comment"),
            ("// fallback", "line-comment"),
            ("<!-- note -->", "html-comment"),
            ("<b>bold</b>", "tag-pair"),
        ];

        for (text, expected) in cases {
            assert_eq!(
                matched_code_pattern(text),
                Some(expected),
                "unexpected signature for {text:?}"
            );
        }
    }

    #[test]
    fn test_prose_does_not_match_signatures() {
        for text in [
            "The agent plans its next action.",
            "Chapter 1: Prompt Chaining",
            "e.g. a planner and an executor",
            "Hello there",
        ] {
            assert_eq!(matched_code_pattern(text), None, "false positive for {text:?}");
        }
    }

    #[test]
    fn test_symbol_density() {
        assert!(is_code_like("if (x > 0) { y = [1]; }"));
        assert!(!is_code_like("Results (see below) are good"));
        // 10 个字符以内不触发密度规则
        assert!(!is_symbol_dense("(a)", 10, 0.15));
    }

    #[test]
    fn test_verbatim_and_non_content_ancestors() {
        let classifier = HeuristicClassifier::default();
        let text = "Run the planner before the executor.";
        assert_eq!(
            classifier.skip_reason(text, &inside(&["html", "body", "pre"])),
            Some(SkipReason::VerbatimElement)
        );
        assert_eq!(
            classifier.skip_reason(text, &inside(&["p", "code"])),
            Some(SkipReason::VerbatimElement)
        );
        assert_eq!(
            classifier.skip_reason(text, &inside(&["head", "title"])),
            Some(SkipReason::NonContentElement)
        );
    }

    #[test]
    fn test_table_cells() {
        let classifier = HeuristicClassifier::default();
        let cell = inside(&["table", "tr", "td"]);
        assert!(classifier.should_skip("x = 5", &cell));
        assert!(!classifier.should_skip("Hello there", &cell));
    }

    #[test]
    fn test_code_class_and_monospace() {
        let classifier = HeuristicClassifier::default();
        let text = "Run the planner before the executor.";

        let highlighted = NodeContext {
            ancestors: vec!["div".into()],
            classes: vec!["language-python".into()],
            ..NodeContext::default()
        };
        assert_eq!(
            classifier.skip_reason(text, &highlighted),
            Some(SkipReason::CodeClass)
        );

        let mono = NodeContext {
            ancestors: vec!["span".into()],
            font_family: Some("courier new, monospace".into()),
            ..NodeContext::default()
        };
        assert_eq!(
            classifier.skip_reason(text, &mono),
            Some(SkipReason::MonospaceFont)
        );

        let serif = NodeContext {
            font_family: Some("georgia, serif".into()),
            ..NodeContext::default()
        };
        assert_eq!(classifier.skip_reason(text, &serif), None);
    }

    #[test]
    fn test_already_translated_text() {
        let classifier = HeuristicClassifier::default();
        assert_eq!(
            classifier.skip_reason("에이전트는 다음 행동을 계획합니다.", &plain()),
            Some(SkipReason::AlreadyTarget)
        );
        assert!(!classifier.is_already_target("LLM agents (에이전트) are everywhere"));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = HeuristicClassifier::default();
        let ctx = inside(&["body", "p"]);
        for text in ["import numpy as np", "The agent plans its next action."] {
            let first = classifier.skip_reason(text, &ctx);
            for _ in 0..5 {
                assert_eq!(classifier.skip_reason(text, &ctx), first);
            }
        }
    }

    #[test]
    fn test_custom_monospace_font() {
        let ctx = NodeContext {
            font_family: Some("\"fira code\"".to_string()),
            ..NodeContext::default()
        };
        let text = "Run the planner before the executor.";

        assert_eq!(HeuristicClassifier::default().skip_reason(text, &ctx), None);
        assert_eq!(
            HeuristicClassifier::default()
                .with_monospace_font(" Fira Code ")
                .skip_reason(text, &ctx),
            Some(SkipReason::MonospaceFont)
        );
    }

    #[test]
    fn test_analysis_details() {
        let classifier = HeuristicClassifier::default();

        let analysis = classifier.analyze("  import numpy as np ", &plain());
        assert_eq!(analysis.trimmed_text, "import numpy as np");
        assert_eq!(analysis.char_count, 18);
        assert_eq!(analysis.matched_pattern, Some("import"));
        assert!(!analysis.should_translate());

        let analysis = classifier.analyze("The agent plans its next action.", &plain());
        assert!(analysis.should_translate());
        assert_eq!(analysis.matched_pattern, None);
        assert_eq!(analysis.symbol_ratio, 0.0);
    }

    #[test]
    fn test_filter_stats_tracking() {
        let mut stats = FilterStats::default();
        stats.record(None);
        stats.record(Some(SkipReason::CodePattern));
        stats.record(Some(SkipReason::CodePattern));

        assert_eq!(stats.total_texts, 3);
        assert_eq!(stats.translatable_texts, 1);
        assert_eq!(stats.by_reason.get(&SkipReason::CodePattern), Some(&2));
        assert!((stats.translatability_rate() - 1.0 / 3.0).abs() < f32::EPSILON);
    }
}
