//! 翻译批次管理器模块
//!
//! 将连续的待翻译文本分组为批次，每个批次用分隔符拼接后作为一次请求提交，
//! 以减少对翻译服务的调用次数。
//!
//! ## 分组规则
//!
//! 1. **保持顺序**: 文本按输入顺序进入批次，批次之间也保持顺序
//! 2. **字符预算**: 批次内累计字符数不超过 `max_chars`
//! 3. **条目上限**: 批次内文本数不超过 `max_items`
//! 4. **超长文本**: 单条文本超过字符预算时独占一个批次，不做截断
//!
//! ## 响应拆分
//!
//! 服务返回的译文按分隔行 `---` 拆分，再按位置映射回原文。段数与请求不符时
//! 由调用方按 `MisalignmentPolicy` 处理，本模块只负责报告拆分结果。
//!
//! ## 使用示例
//!
//! ```rust
//! use bookbinder::translation::pipeline::batch::{BatchManager, BatchManagerConfig};
//!
//! let mut manager = BatchManager::new(BatchManagerConfig {
//!     max_chars: 20,
//!     max_items: 2,
//! });
//!
//! let batches = manager.create_batches(vec![
//!     "First sentence.".to_string(),
//!     "Second.".to_string(),
//!     "Third.".to_string(),
//! ]);
//! assert_eq!(batches.len(), 2);
//! assert_eq!(manager.get_stats().output_batches, 2);
//! ```

use crate::translation::config::{constants, TranslationConfig};

/// 翻译批次
///
/// 一组按顺序排列的待翻译文本。`total_chars` 按字符（而非字节）计数，
/// 与字符预算使用同一口径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次序号，从 0 开始
    pub id: usize,
    /// 包含的文本
    pub texts: Vec<String>,
    /// 字符总数
    pub total_chars: usize,
}

impl Batch {
    fn new(id: usize) -> Self {
        Self {
            id,
            texts: Vec::new(),
            total_chars: 0,
        }
    }

    fn push(&mut self, text: String, chars: usize) {
        self.total_chars += chars;
        self.texts.push(text);
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// 用分隔符拼接为一次请求的内容
    pub fn joined(&self, delimiter: &str) -> String {
        self.texts.join(delimiter)
    }

    /// 批次摘要，用于调试日志
    pub fn summary(&self) -> String {
        format!(
            "批次 #{}: {} 条文本, {} 字符",
            self.id,
            self.texts.len(),
            self.total_chars
        )
    }
}

/// 拆分批次响应
///
/// 以只包含 `---` 的行作为分隔，兼容服务在分隔符两侧增减空行的情况。
/// 每段去除首尾空白。
pub fn split_response(response: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in response.lines() {
        if line.trim() == "---" {
            segments.push(current.join("\n").trim().to_string());
            current.clear();
        } else {
            current.push(line);
        }
    }
    segments.push(current.join("\n").trim().to_string());

    segments
}

/// 批次管理器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchManagerConfig {
    /// 单个批次的字符预算
    pub max_chars: usize,
    /// 单个批次的文本数上限
    pub max_items: usize,
}

impl From<&TranslationConfig> for BatchManagerConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_chars: config.batch_max_chars,
            max_items: config.batch_max_items,
        }
    }
}

impl Default for BatchManagerConfig {
    fn default() -> Self {
        Self {
            max_chars: constants::DEFAULT_BATCH_MAX_CHARS,
            max_items: constants::DEFAULT_BATCH_MAX_ITEMS,
        }
    }
}

/// 批次统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub input_items: usize,
    pub output_batches: usize,
    /// 超过字符预算而独占批次的文本
    pub oversized_items: usize,
}

/// 批次管理器
pub struct BatchManager {
    config: BatchManagerConfig,
    stats: BatchStats,
}

impl BatchManager {
    /// 创建新的批次管理器；预算为 0 时按 1 处理
    pub fn new(config: BatchManagerConfig) -> Self {
        Self {
            config: BatchManagerConfig {
                max_chars: config.max_chars.max(1),
                max_items: config.max_items.max(1),
            },
            stats: BatchStats::default(),
        }
    }

    /// 按顺序把文本分组为批次
    pub fn create_batches(&mut self, texts: Vec<String>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current = Batch::new(0);

        self.stats.input_items += texts.len();

        for text in texts {
            let chars = text.chars().count();

            if chars > self.config.max_chars {
                self.stats.oversized_items += 1;
                tracing::debug!("文本超过批次字符预算 ({} > {})，单独成批", chars, self.config.max_chars);
            }

            if self.should_start_new_batch(&current, chars) {
                let next_id = current.id + 1;
                batches.push(std::mem::replace(&mut current, Batch::new(next_id)));
            }
            current.push(text, chars);
        }

        if !current.is_empty() {
            batches.push(current);
        }

        self.stats.output_batches += batches.len();
        for batch in &batches {
            tracing::debug!("{}", batch.summary());
        }
        batches
    }

    fn should_start_new_batch(&self, current: &Batch, next_chars: usize) -> bool {
        !current.is_empty()
            && (current.total_chars + next_chars > self.config.max_chars
                || current.len() >= self.config.max_items)
    }

    pub fn get_stats(&self) -> &BatchStats {
        &self.stats
    }
}

impl Default for BatchManager {
    fn default() -> Self {
        Self::new(BatchManagerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_batch_creation_empty_input() {
        let mut manager = BatchManager::default();
        assert!(manager.create_batches(Vec::new()).is_empty());
        assert_eq!(manager.get_stats().output_batches, 0);
    }

    #[test]
    fn test_item_limit() {
        let mut manager = BatchManager::new(BatchManagerConfig {
            max_chars: 10_000,
            max_items: 3,
        });
        let batches = manager.create_batches(texts(&["a1", "a2", "a3", "a4", "a5", "a6", "a7"]));

        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let ids: Vec<usize> = batches.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_character_budget() {
        let mut manager = BatchManager::new(BatchManagerConfig {
            max_chars: 10,
            max_items: 100,
        });
        let batches = manager.create_batches(texts(&["aaaa", "bbbb", "cccc", "dd"]));

        assert_eq!(batches[0].texts, texts(&["aaaa", "bbbb"]));
        assert_eq!(batches[1].texts, texts(&["cccc", "dd"]));
        assert!(batches.iter().all(|b| b.total_chars <= 10));
    }

    #[test]
    fn test_characters_not_bytes() {
        let mut manager = BatchManager::new(BatchManagerConfig {
            max_chars: 4,
            max_items: 100,
        });
        // 每个韩文字符占 3 个字节，但只计 1 个字符
        let batches = manager.create_batches(texts(&["가나", "다라"]));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].total_chars, 4);
    }

    #[test]
    fn test_oversized_item_gets_own_batch() {
        let mut manager = BatchManager::new(BatchManagerConfig {
            max_chars: 5,
            max_items: 10,
        });
        let batches = manager.create_batches(texts(&["ab", "abcdefghij", "cd"]));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].texts, texts(&["abcdefghij"]));
        assert_eq!(manager.get_stats().oversized_items, 1);
    }

    #[test]
    fn test_order_is_preserved() {
        let input: Vec<String> = (0..25).map(|i| format!("text {i}")).collect();
        let mut manager = BatchManager::new(BatchManagerConfig {
            max_chars: 30,
            max_items: 4,
        });
        let flattened: Vec<String> = manager
            .create_batches(input.clone())
            .into_iter()
            .flat_map(|b| b.texts)
            .collect();
        assert_eq!(flattened, input);
    }

    #[test]
    fn test_joined_and_split_response() {
        let batch = Batch {
            id: 0,
            texts: texts(&["One.", "Two.", "Three."]),
            total_chars: 13,
        };
        let joined = batch.joined(constants::BATCH_DELIMITER);
        assert_eq!(joined, "One.\n\n---\n\nTwo.\n\n---\n\nThree.");
        assert_eq!(split_response(&joined), texts(&["One.", "Two.", "Three."]));

        // 分隔符两侧空行不一致
        assert_eq!(
            split_response("하나.\n---\n둘.\n\n\n---\n셋."),
            texts(&["하나.", "둘.", "셋."])
        );
        assert_eq!(split_response("only one"), texts(&["only one"]));
    }
}
