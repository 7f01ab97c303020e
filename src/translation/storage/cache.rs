//! 翻译记忆模块
//!
//! 原文（去除首尾空白）到译文的精确匹配缓存，以格式化的 UTF-8 JSON 对象持久化。
//! 条目只增不减，没有过期和淘汰。

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::translation::error::{TranslationError, TranslationResult};

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// 加载时已有的条目
    pub loaded_entries: usize,
    /// 本次运行新增的条目
    pub new_entries: usize,
    /// 被新值覆盖的条目
    pub replaced_entries: usize,
}

/// 翻译记忆
#[derive(Debug, Clone, Default)]
pub struct TranslationMemory {
    entries: BTreeMap<String, String>,
    /// 所有译文，用于识别已经翻译过的节点
    values: HashSet<String>,
    stats: CacheStats,
}

impl TranslationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加载翻译记忆；文件不存在时返回空记忆，文件损坏时记录警告并返回空记忆
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("翻译记忆不存在，从空记忆开始: {}", path.display());
            return Self::new();
        }

        match Self::try_load(path) {
            Ok(memory) => {
                tracing::info!("已加载翻译记忆: {} 条 ({})", memory.len(), path.display());
                memory
            }
            Err(e) => {
                tracing::warn!("翻译记忆无法读取，从空记忆开始 {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    fn try_load(path: &Path) -> TranslationResult<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| TranslationError::memory(path, e))?;
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|e| TranslationError::memory(path, e))?;
        let values = entries.values().cloned().collect();
        let stats = CacheStats {
            loaded_entries: entries.len(),
            ..CacheStats::default()
        };

        Ok(Self {
            entries,
            values,
            stats,
        })
    }

    /// 写入文件，按需创建父目录
    pub fn save(&self, path: &Path) -> TranslationResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TranslationError::memory(path, e))?;
        }

        let mut content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| TranslationError::memory(path, e))?;
        content.push('\n');
        fs::write(path, content).map_err(|e| TranslationError::memory(path, e))?;

        tracing::info!("已保存翻译记忆: {} 条 ({})", self.len(), path.display());
        Ok(())
    }

    /// 精确匹配查找
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// 记录译文；原文或译文为空时忽略
    pub fn insert(&mut self, source: &str, translation: &str) {
        let source = source.trim();
        let translation = translation.trim();
        if source.is_empty() || translation.is_empty() {
            return;
        }

        self.values.insert(translation.to_string());
        match self
            .entries
            .insert(source.to_string(), translation.to_string())
        {
            None => self.stats.new_entries += 1,
            Some(previous) if previous != translation => self.stats.replaced_entries += 1,
            Some(_) => {}
        }
    }

    /// 文本是否是记忆中某条译文
    pub fn is_known_translation(&self, text: &str) -> bool {
        self.values.contains(text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn new_entries(&self) -> usize {
        self.stats.new_entries
    }

    pub fn get_stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut tm = TranslationMemory::new();
        tm.insert("  Hello world  ", "안녕하세요 세계");
        tm.insert("", "ignored");
        tm.insert("Empty result", "   ");

        assert_eq!(tm.len(), 1);
        assert_eq!(tm.get("Hello world"), Some("안녕하세요 세계"));
        assert!(tm.is_known_translation("안녕하세요 세계"));
        assert_eq!(tm.new_entries(), 1);
    }

    #[test]
    fn test_exact_match_only() {
        let mut tm = TranslationMemory::new();
        tm.insert("Agent", "에이전트");
        assert_eq!(tm.get("agent"), None);
        assert_eq!(tm.get("Agent."), None);
    }

    #[test]
    fn test_save_writes_pretty_utf8_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work").join("tm.json");

        let mut tm = TranslationMemory::new();
        tm.insert("Routing", "라우팅");
        tm.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"Routing\": \"라우팅\"\n}\n");

        let reloaded = TranslationMemory::load(&path);
        assert_eq!(reloaded.get("Routing"), Some("라우팅"));
        assert_eq!(reloaded.get_stats().loaded_entries, 1);
        assert_eq!(reloaded.new_entries(), 0);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tm.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(TranslationMemory::load(&path).is_empty());
        assert!(TranslationMemory::load(&dir.path().join("missing.json")).is_empty());
    }
}
