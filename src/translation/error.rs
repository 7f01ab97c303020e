//! 翻译阶段的错误类型
//!
//! 每个错误只影响当前翻译单元：原文保留，错误计入 [`ErrorStats`]。
//! `Critical` 级别的错误之后不再发送请求，但译文文件和翻译记忆照常写出。

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置缺失或无效，例如没有 API 密钥
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("请求速率过快，已达到限制")]
    RateLimitExceeded,

    /// 服务提供方返回的错误状态
    #[error("翻译服务错误 (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// 响应无法解析或没有译文
    #[error("响应无效: {0}")]
    InvalidResponse(String),

    /// 写回目标不是文本节点
    #[error("替换目标不是文本节点")]
    NotTextNode,

    /// 翻译记忆文件读写失败
    #[error("翻译记忆 {}: {message}", .path.display())]
    Memory { path: PathBuf, message: String },

    /// HTML 文件读写失败
    #[error("无法访问 {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl TranslationError {
    pub fn memory(path: &Path, error: impl fmt::Display) -> Self {
        TranslationError::Memory {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    pub fn io(path: &Path, error: impl fmt::Display) -> Self {
        TranslationError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    /// 稍后重试可能成功的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) | TranslationError::InvalidResponse(_) => true,
            TranslationError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::ApiError { status: 401 | 403, .. } => ErrorSeverity::Critical,
            TranslationError::ApiError { .. } => ErrorSeverity::Error,
            TranslationError::NetworkError(_)
            | TranslationError::RateLimitExceeded
            | TranslationError::InvalidResponse(_)
            | TranslationError::Memory { .. } => ErrorSeverity::Warning,
            TranslationError::NotTextNode | TranslationError::Io { .. } => ErrorSeverity::Error,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::RateLimitExceeded => ErrorCategory::RateLimit,
            TranslationError::ApiError { .. } | TranslationError::InvalidResponse(_) => {
                ErrorCategory::Service
            }
            TranslationError::NotTextNode => ErrorCategory::Processing,
            TranslationError::Memory { .. } => ErrorCategory::Memory,
            TranslationError::Io { .. } => ErrorCategory::Io,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    RateLimit,
    Service,
    Processing,
    Memory,
    Io,
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        match error.status().map(|s| s.as_u16()) {
            Some(429) => TranslationError::RateLimitExceeded,
            Some(status) => TranslationError::ApiError {
                status,
                message: error.to_string(),
            },
            None if error.is_decode() => TranslationError::InvalidResponse(error.to_string()),
            None => TranslationError::NetworkError(error.to_string()),
        }
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;

/// 一次运行中的错误统计
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: HashMap<ErrorCategory, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    pub fn record_error(&mut self, error: &TranslationError) {
        self.total_errors += 1;
        *self.by_category.entry(error.category()).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }
        if error.severity() == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }
}

/// 按严重程度记录一次服务提供方请求的失败
pub fn log_error(provider: &str, error: &TranslationError) {
    match error.severity() {
        ErrorSeverity::Info => tracing::info!("{} 请求: {}", provider, error),
        ErrorSeverity::Warning => tracing::warn!("{} 请求失败: {}", provider, error),
        ErrorSeverity::Error => tracing::error!("{} 请求失败: {}", provider, error),
        ErrorSeverity::Critical => tracing::error!("{} 请求失败，停止后续请求: {}", provider, error),
    }
}
