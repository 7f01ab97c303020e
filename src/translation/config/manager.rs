//! 翻译配置管理器
//!
//! 提供统一的配置接口：默认值 → 配置文件 → 环境变量，依次覆盖

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!("unknown provider '{}', expected anthropic or openai", other)),
        }
    }
}

/// 文本提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum BatchMode {
    /// 每个文本单独请求
    #[default]
    #[serde(rename = "per-node")]
    PerNode,
    /// 多个文本用分隔符拼接后一次请求
    #[serde(rename = "batch")]
    Batch,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-node" | "per_node" | "pernode" | "single" => Ok(BatchMode::PerNode),
            "batch" => Ok(BatchMode::Batch),
            other => Err(format!("unknown batch mode '{}', expected per-node or batch", other)),
        }
    }
}

/// 批次响应段数与请求不符时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum MisalignmentPolicy {
    /// 逐条重新翻译该批次
    #[default]
    #[serde(rename = "fallback")]
    FallbackPerNode,
    /// 丢弃该批次，节点保留原文
    #[serde(rename = "drop")]
    SilentDrop,
    /// 该批次记为失败，节点保留原文，不做逐条重试
    #[serde(rename = "fail")]
    Fail,
}

impl FromStr for MisalignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" | "per-node" => Ok(MisalignmentPolicy::FallbackPerNode),
            "drop" | "skip" => Ok(MisalignmentPolicy::SilentDrop),
            "fail" | "error" => Ok(MisalignmentPolicy::Fail),
            other => Err(format!(
                "unknown misalignment policy '{}', expected fallback, drop or fail",
                other
            )),
        }
    }
}

/// 单个服务提供方的连接设置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// 密钥只从环境变量或配置文件读取，不会写回示例配置
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl ProviderSettings {
    fn openai() -> Self {
        Self {
            api_key: None,
            model: constants::DEFAULT_OPENAI_MODEL.to_string(),
            base_url: constants::DEFAULT_OPENAI_BASE_URL.to_string(),
            max_tokens: constants::DEFAULT_OPENAI_MAX_TOKENS,
        }
    }

    fn anthropic() -> Self {
        Self {
            api_key: None,
            model: constants::DEFAULT_ANTHROPIC_MODEL.to_string(),
            base_url: constants::DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            max_tokens: constants::DEFAULT_ANTHROPIC_MAX_TOKENS,
        }
    }
}

/// 翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub provider: ProviderKind,
    pub target_lang: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,

    // 服务提供方
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,

    // 批次配置
    pub batch_mode: BatchMode,
    pub batch_max_chars: usize,
    pub batch_max_items: usize,
    pub misalignment: MisalignmentPolicy,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            temperature: constants::DEFAULT_TEMPERATURE,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,

            openai: ProviderSettings::openai(),
            anthropic: ProviderSettings::anthropic(),

            batch_mode: BatchMode::default(),
            batch_max_chars: constants::DEFAULT_BATCH_MAX_CHARS,
            batch_max_items: constants::DEFAULT_BATCH_MAX_ITEMS,
            misalignment: MisalignmentPolicy::default(),
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.batch_max_chars == 0 {
            return Err(TranslationError::ConfigError("批次字符预算不能为0".to_string()));
        }

        if self.batch_max_items == 0 {
            return Err(TranslationError::ConfigError("批次条目上限不能为0".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TranslationError::ConfigError(format!(
                "temperature 必须在 0 到 2 之间: {}",
                self.temperature
            )));
        }

        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        let settings = self.active_provider();
        if settings.model.trim().is_empty() {
            return Err(TranslationError::ConfigError(format!(
                "{} 模型名称不能为空",
                self.provider
            )));
        }

        Ok(())
    }

    /// 当前提供方的设置
    pub fn active_provider(&self) -> &ProviderSettings {
        match self.provider {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }

    /// 当前提供方的密钥，缺失时返回配置错误
    pub fn require_api_key(&self) -> TranslationResult<&str> {
        self.active_provider()
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                let var = match self.provider {
                    ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
                    ProviderKind::OpenAi => "OPENAI_API_KEY",
                };
                TranslationError::ConfigError(format!("缺少 {} ，无法调用翻译服务", var))
            })
    }

    /// 应用环境变量覆盖；已设置但无效的变量视为配置错误
    pub fn apply_env_overrides(&mut self) -> TranslationResult<()> {
        use crate::env::{batch, provider, EnvVar};

        let env_err = |e: crate::env::EnvError| TranslationError::ConfigError(e.to_string());

        if let Some(kind) = provider::Provider::get_opt().map_err(env_err)? {
            self.provider = kind;
        }

        if let Some(key) = provider::OpenAiApiKey::get_opt().map_err(env_err)? {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = provider::OpenAiModel::get_opt().map_err(env_err)? {
            self.openai.model = model;
        }
        if let Some(url) = provider::OpenAiBaseUrl::get_opt().map_err(env_err)? {
            tracing::info!("环境变量覆盖 OpenAI 地址: {}", url);
            self.openai.base_url = url;
        }

        if let Some(key) = provider::AnthropicApiKey::get_opt().map_err(env_err)? {
            self.anthropic.api_key = Some(key);
        }
        if let Some(model) = provider::AnthropicModel::get_opt().map_err(env_err)? {
            self.anthropic.model = model;
        }
        if let Some(url) = provider::AnthropicBaseUrl::get_opt().map_err(env_err)? {
            tracing::info!("环境变量覆盖 Anthropic 地址: {}", url);
            self.anthropic.base_url = url;
        }

        if let Some(mode) = batch::Mode::get_opt().map_err(env_err)? {
            self.batch_mode = mode;
        }
        if let Some(max_chars) = batch::MaxChars::get_opt().map_err(env_err)? {
            self.batch_max_chars = max_chars;
        }
        if let Some(max_items) = batch::MaxItems::get_opt().map_err(env_err)? {
            self.batch_max_items = max_items;
        }
        if let Some(policy) = batch::Misalignment::get_opt().map_err(env_err)? {
            self.misalignment = policy;
        }

        Ok(())
    }

    /// 请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置文件，再叠加环境变量
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    fn load_config() -> TranslationResult<TranslationConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let path = Path::new(expanded_path.as_ref());
            if path.exists() {
                tracing::info!("加载配置文件: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置，`.json` 以外的文件按 TOML 解析
    pub fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &Path) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

/// 加载 .env 文件，先找到的优先，已存在的环境变量不会被覆盖
pub fn load_dotenv() {
    let env_files = [".env.local", ".env"];

    for env_file in &env_files {
        if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
            tracing::info!("已加载环境变量文件: {}", env_file);
        }
    }
}
