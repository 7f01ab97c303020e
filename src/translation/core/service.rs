//! 翻译服务核心实现
//!
//! 本模块把文本收集、翻译记忆、批次处理和结果写回串成一次完整的 DOM 翻译。
//!
//! ## 处理流程
//!
//! 1. **收集**: 按文档顺序收集分类器判定为自然语言的文本节点
//! 2. **查缓存**: 翻译记忆中已有的文本直接使用缓存译文，不调用服务
//! 3. **去重**: 同一次运行中重复出现的未缓存文本只请求一次
//! 4. **翻译**: 逐条请求，或按批次拼接后请求
//! 5. **记录**: 新译文写入翻译记忆
//! 6. **写回**: 遍历结束后统一替换文本节点，保留原有首尾空白
//!
//! 单个文本或批次的失败只记录日志并保留原文；认证失败、配置错误这类严重错误会中止翻译。
//! 服务不做重试。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::path::Path;
//! use bookbinder::translation::config::ConfigManager;
//! use bookbinder::translation::core::{translate_html_file, TranslationService};
//!
//! let config = ConfigManager::new()?.into_config();
//! let mut service = TranslationService::from_config(config)?;
//! let report = translate_html_file(
//!     Path::new("work/master_en.html"),
//!     Path::new("work/master_ko.html"),
//!     Path::new("work/tm.json"),
//!     &mut service,
//! )?;
//! println!("{}", report);
//! # Ok::<(), bookbinder::translation::error::TranslationError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Instant;

use markup5ever_rcdom::RcDom;

use super::engine::{create_translator, Translator};
use crate::parsers::html::serializer::{read_html_file, write_html_file};
use crate::translation::{
    config::{constants, BatchMode, MisalignmentPolicy, TranslationConfig},
    error::{log_error, ErrorSeverity, ErrorStats, TranslationError, TranslationResult},
    pipeline::batch::{split_response, Batch, BatchManager, BatchManagerConfig},
    pipeline::collector::TextCollector,
    pipeline::filters::{is_code_like, HeuristicClassifier, TextClassifier},
    processor::{apply_replacements, Replacement},
    storage::cache::TranslationMemory,
};

/// 一次翻译的统计报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// 遍历到的文本节点
    pub nodes_seen: usize,
    /// 分类器判定跳过的节点，包括已是译文的节点
    pub skipped: usize,
    /// 需要翻译的节点
    pub translatable: usize,
    /// 命中翻译记忆的节点
    pub cache_hits: usize,
    /// 实际发出的服务请求
    pub provider_calls: usize,
    /// 新得到译文的不同文本
    pub translated: usize,
    /// 失败的文本
    pub failed: usize,
    /// 段数不符的批次
    pub misaligned_batches: usize,
    /// 逐条提交前因疑似代码而保留原文的文本
    pub rechecked_as_code: usize,
    /// 实际被改写的节点
    pub nodes_rewritten: usize,
    /// 因严重错误（认证失败、配置错误）提前停止请求
    pub stopped_early: bool,
    /// 翻译记忆新增条目
    pub new_tm_entries: usize,
}

impl fmt::Display for TranslationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "文本节点 {} 个 (跳过 {}, 待翻译 {}), 缓存命中 {}, 请求 {} 次, 新译文 {}, 失败 {}, 段数不符批次 {}, 改写节点 {}, 翻译记忆新增 {}",
            self.nodes_seen,
            self.skipped,
            self.translatable,
            self.cache_hits,
            self.provider_calls,
            self.translated,
            self.failed,
            self.misaligned_batches,
            self.nodes_rewritten,
            self.new_tm_entries
        )?;
        if self.stopped_early {
            write!(f, " (提前停止请求)")?;
        }
        Ok(())
    }
}

/// 翻译服务
///
/// 服务提供方和分类器都通过接口注入，测试时可以替换为脚本化的实现。
pub struct TranslationService {
    translator: Box<dyn Translator>,
    classifier: Box<dyn TextClassifier>,
    config: TranslationConfig,
    error_stats: ErrorStats,
}

impl TranslationService {
    /// 创建新的翻译服务
    pub fn new(
        translator: Box<dyn Translator>,
        classifier: Box<dyn TextClassifier>,
        config: TranslationConfig,
    ) -> Self {
        Self {
            translator,
            classifier,
            config,
            error_stats: ErrorStats::default(),
        }
    }

    /// 按配置创建服务提供方，使用默认分类器
    pub fn from_config(config: TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;
        let translator = create_translator(&config)?;
        let classifier = Box::new(HeuristicClassifier::new(&config.target_lang));
        Ok(Self::new(translator, classifier, config))
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn get_error_stats(&self) -> &ErrorStats {
        &self.error_stats
    }

    /// 翻译 DOM 中的自然语言文本，结果写回 DOM 并记录到翻译记忆
    pub fn translate_dom(
        &mut self,
        dom: &RcDom,
        tm: &mut TranslationMemory,
    ) -> TranslationResult<TranslationReport> {
        let start = Instant::now();
        let new_before = tm.new_entries();
        let mut report = TranslationReport::default();

        // 1. 收集
        let mut collector = TextCollector::new();
        let items = collector.collect(&dom.document, self.classifier.as_ref());
        let stats = collector.get_stats();
        report.nodes_seen = stats.text_nodes;
        report.skipped = stats.total_skipped();

        // 2. 查缓存、去重
        let mut pending: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut targets = Vec::with_capacity(items.len());

        for item in &items {
            if tm.contains(&item.text) {
                report.cache_hits += 1;
            } else if tm.is_known_translation(&item.text) {
                report.skipped += 1;
                continue;
            } else if seen.insert(item.text.as_str()) {
                pending.push(item.text.clone());
            }
            targets.push(item);
        }
        report.translatable = targets.len();

        tracing::info!(
            "开始翻译: {} 个待翻译节点, 缓存命中 {}, 需要请求的不同文本 {}",
            report.translatable,
            report.cache_hits,
            pending.len()
        );

        // 3. 翻译
        let results = match self.config.batch_mode {
            BatchMode::PerNode => self.translate_per_node(&pending, &mut report),
            BatchMode::Batch => self.translate_batches(pending, &mut report),
        };

        // 4. 记录
        report.translated = results.len();
        for (source, translated) in &results {
            tm.insert(source, translated);
        }

        // 5. 写回
        let replacements: Vec<Replacement> = targets
            .iter()
            .filter_map(|item| {
                tm.get(&item.text)
                    .filter(|translated| *translated != item.text)
                    .map(|translated| Replacement {
                        node: item.node.clone(),
                        translated: translated.to_string(),
                    })
            })
            .collect();
        let applied = apply_replacements(&replacements)?;

        report.nodes_rewritten = applied.applied;
        report.new_tm_entries = tm.new_entries() - new_before;

        tracing::info!("翻译完成 ({:.1}s): {}", start.elapsed().as_secs_f32(), report);
        Ok(report)
    }

    /// 记录一次失败；严重错误之后不再发出请求
    fn record_failure(&self, error: &TranslationError, units: usize, report: &mut TranslationReport) {
        report.failed += units;
        if error.severity() == ErrorSeverity::Critical && !report.stopped_early {
            tracing::error!("服务提供方不可用，停止后续请求，其余文本保留原文: {}", error);
            report.stopped_early = true;
        }
    }

    /// 逐条翻译；提交前再次检查是否像代码
    fn translate_per_node(
        &mut self,
        texts: &[String],
        report: &mut TranslationReport,
    ) -> HashMap<String, String> {
        let mut results = HashMap::new();

        for (i, text) in texts.iter().enumerate() {
            if report.stopped_early {
                report.failed += 1;
                continue;
            }
            if is_code_like(text) {
                report.rechecked_as_code += 1;
                continue;
            }

            match self.request(text, report) {
                Ok(translated) => {
                    results.insert(text.clone(), translated);
                }
                Err(error) => self.record_failure(&error, 1, report),
            }

            if (i + 1) % 50 == 0 {
                tracing::info!("翻译进度: {}/{}", i + 1, texts.len());
            }
        }

        results
    }

    /// 按批次翻译
    fn translate_batches(
        &mut self,
        texts: Vec<String>,
        report: &mut TranslationReport,
    ) -> HashMap<String, String> {
        let mut manager = BatchManager::new(BatchManagerConfig::from(&self.config));
        let batches = manager.create_batches(texts);
        let total = batches.len();
        let mut results = HashMap::new();

        tracing::info!("批次处理: {} 个批次", total);

        for batch in batches {
            if report.stopped_early {
                report.failed += batch.len();
                continue;
            }
            tracing::debug!("处理{} ({}/{})", batch.summary(), batch.id + 1, total);

            let response = match self.request(&batch.joined(constants::BATCH_DELIMITER), report) {
                Ok(response) => response,
                Err(error) => {
                    self.record_failure(&error, batch.len(), report);
                    continue;
                }
            };

            let segments = split_response(&response);
            if segments.len() == batch.len() {
                for (source, translated) in batch.texts.iter().zip(segments) {
                    if translated.is_empty() {
                        report.failed += 1;
                    } else {
                        results.insert(source.clone(), translated);
                    }
                }
                continue;
            }

            report.misaligned_batches += 1;
            tracing::warn!(
                "批次 #{} 段数不符: 请求 {} 段, 返回 {} 段, 处理方式 {:?}",
                batch.id,
                batch.len(),
                segments.len(),
                self.config.misalignment
            );

            self.handle_misaligned(&batch, segments, &mut results, report);
        }

        results
    }

    fn handle_misaligned(
        &mut self,
        batch: &Batch,
        segments: Vec<String>,
        results: &mut HashMap<String, String>,
        report: &mut TranslationReport,
    ) {
        match self.config.misalignment {
            MisalignmentPolicy::FallbackPerNode => {
                let retried = self.translate_per_node(&batch.texts, report);
                results.extend(retried);
            }
            MisalignmentPolicy::SilentDrop => {
                // 只使用前 min(n, m) 段
                for (source, translated) in batch.texts.iter().zip(segments) {
                    if !translated.is_empty() {
                        results.insert(source.clone(), translated);
                    }
                }
            }
            MisalignmentPolicy::Fail => {
                report.failed += batch.len();
            }
        }
    }

    fn request(&mut self, text: &str, report: &mut TranslationReport) -> TranslationResult<String> {
        report.provider_calls += 1;
        self.translator.translate(text).map_err(|error| {
            log_error(self.translator.name(), &error);
            self.error_stats.record_error(&error);
            error
        })
    }
}

/// 翻译 HTML 文件
///
/// 先加载翻译记忆，翻译后保存翻译记忆；保存失败只记录警告。
/// 服务提供方的错误不会中止本阶段：失败的文本保留原文，译文文件照常写出。
pub fn translate_html_file(
    input: &Path,
    output: &Path,
    tm_path: &Path,
    service: &mut TranslationService,
) -> TranslationResult<TranslationReport> {
    let dom = read_html_file(input).map_err(|e| TranslationError::io(input, e))?;
    let mut tm = TranslationMemory::load(tm_path);

    let result = service.translate_dom(&dom, &mut tm);

    if let Err(e) = tm.save(tm_path) {
        tracing::warn!("保存翻译记忆失败: {}", e);
    }

    let report = result?;
    write_html_file(&dom, output).map_err(|e| TranslationError::io(output, e))?;
    tracing::info!("已写入译文: {}", output.display());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::parsers::html::dom::html_to_dom;
    use crate::parsers::html::serializer::serialize_document;

    /// 按前缀返回译文的假翻译器
    struct Prefixer {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl Translator for Prefixer {
        fn name(&self) -> &str {
            "prefixer"
        }

        fn translate(&self, text: &str) -> TranslationResult<String> {
            self.calls.borrow_mut().push(text.to_string());
            Ok(text
                .split(constants::BATCH_DELIMITER)
                .map(|s| format!("KO[{}]", s))
                .collect::<Vec<_>>()
                .join(constants::BATCH_DELIMITER))
        }
    }

    fn service(mode: BatchMode) -> (TranslationService, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let config = TranslationConfig {
            batch_mode: mode,
            ..TranslationConfig::default()
        };
        let service = TranslationService::new(
            Box::new(Prefixer {
                calls: calls.clone(),
            }),
            Box::new(HeuristicClassifier::default()),
            config,
        );
        (service, calls)
    }

    const PAGE: &str = "<h1>Prompt Chaining</h1><p>The agent plans its next action.</p>\
                        <pre>import numpy as np</pre><p>The agent plans its next action.</p>";

    #[test]
    fn test_per_node_translation_and_dedup() {
        let (mut service, calls) = service(BatchMode::PerNode);
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let mut tm = TranslationMemory::new();

        let report = service.translate_dom(&dom, &mut tm).unwrap();

        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(report.translatable, 3);
        assert_eq!(report.translated, 2);
        assert_eq!(report.nodes_rewritten, 3);
        assert_eq!(report.new_tm_entries, 2);

        let html = String::from_utf8(serialize_document(&dom).unwrap()).unwrap();
        assert!(html.contains("<h1>KO[Prompt Chaining]</h1>"));
        assert!(html.contains("<pre>import numpy as np</pre>"));
    }

    #[test]
    fn test_batch_mode_single_request() {
        let (mut service, calls) = service(BatchMode::Batch);
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let mut tm = TranslationMemory::new();

        let report = service.translate_dom(&dom, &mut tm).unwrap();

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(report.misaligned_batches, 0);
        assert_eq!(tm.get("Prompt Chaining"), Some("KO[Prompt Chaining]"));
        // 拼接后的请求不作为翻译记忆的键
        assert_eq!(tm.len(), 2);
    }

    #[test]
    fn test_cached_texts_skip_provider() {
        let (mut service, calls) = service(BatchMode::PerNode);
        let dom = html_to_dom(PAGE.as_bytes(), "utf-8").unwrap();
        let mut tm = TranslationMemory::new();
        tm.insert("Prompt Chaining", "프롬프트 체이닝");
        tm.insert("The agent plans its next action.", "에이전트는 다음 행동을 계획합니다.");

        let report = service.translate_dom(&dom, &mut tm).unwrap();

        assert!(calls.borrow().is_empty());
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.provider_calls, 0);
    }
}
