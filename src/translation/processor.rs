//! 翻译结果写回模块
//!
//! 遍历结束后统一修改 DOM：遍历期间只收集 `(节点, 译文)`，避免边遍历边修改。

use markup5ever_rcdom::{Handle, NodeData};

use crate::translation::error::{TranslationError, TranslationResult};

/// 一次待写回的替换
#[derive(Debug, Clone)]
pub struct Replacement {
    pub node: Handle,
    /// 去除首尾空白的译文
    pub translated: String,
}

/// 写回统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub applied: usize,
    /// 译文与原文相同而未修改
    pub unchanged: usize,
}

/// 保留原文本首尾空白，把中间部分替换为译文
pub fn wrap_like_original(original: &str, translated: &str) -> String {
    let start = original.len() - original.trim_start().len();
    let end = original.trim_end().len();
    if start >= end {
        return translated.to_string();
    }
    format!("{}{}{}", &original[..start], translated, &original[end..])
}

/// 将替换写回文本节点；只有译文与原文（去空白后）不同时才修改
pub fn apply_replacements(replacements: &[Replacement]) -> TranslationResult<ProcessorStats> {
    let mut stats = ProcessorStats::default();

    for replacement in replacements {
        let NodeData::Text { ref contents } = replacement.node.data else {
            return Err(TranslationError::NotTextNode);
        };

        let new_text = {
            let current = contents.borrow();
            if current.trim() == replacement.translated {
                stats.unchanged += 1;
                continue;
            }
            wrap_like_original(&current, &replacement.translated)
        };

        let mut content_ref = contents.borrow_mut();
        content_ref.clear();
        content_ref.push_slice(&new_text);
        stats.applied += 1;
    }

    Ok(stats)
}
