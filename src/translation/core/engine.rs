//! 翻译引擎
//!
//! [`Translator`] 是翻译服务提供方的接口：输入一段文本，返回去除首尾空白的译文。
//! 这里提供两个基于阻塞 `reqwest` 的实现：
//!
//! - [`OpenAiTranslator`]: `POST {base}/chat/completions`，Bearer 认证
//! - [`AnthropicTranslator`]: `POST {base}/v1/messages`，`x-api-key` 认证
//!
//! 引擎本身不做重试，失败直接返回给调用方。

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::translation::config::{constants, ProviderKind, ProviderSettings, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::prompts;

/// 翻译服务提供方接口
pub trait Translator {
    /// 提供方名称，用于日志
    fn name(&self) -> &str;

    /// 翻译一段文本
    fn translate(&self, text: &str) -> TranslationResult<String>;
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn translate(&self, text: &str) -> TranslationResult<String> {
        (**self).translate(text)
    }
}

/// 按配置创建翻译器
pub fn create_translator(config: &TranslationConfig) -> TranslationResult<Box<dyn Translator>> {
    let api_key = config.require_api_key()?;
    let settings = config.active_provider();
    let timeout = config.request_timeout();

    tracing::info!("翻译服务: {} (模型 {})", config.provider, settings.model);

    Ok(match config.provider {
        ProviderKind::OpenAi => Box::new(OpenAiTranslator::new(
            settings,
            api_key,
            config.temperature,
            timeout,
        )?),
        ProviderKind::Anthropic => Box::new(AnthropicTranslator::new(
            settings,
            api_key,
            config.temperature,
            timeout,
        )?),
    })
}

fn build_client(timeout: Duration) -> TranslationResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("无法创建 HTTP 客户端: {}", e)))
}

/// 错误响应体，两个提供方格式一致
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// 检查响应状态，非 2xx 时转换为对应错误
fn check_status(response: Response) -> TranslationResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        return Err(TranslationError::RateLimitExceeded);
    }

    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(TranslationError::ApiError {
        status: status.as_u16(),
        message,
    })
}

fn non_empty(text: String) -> TranslationResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(TranslationError::InvalidResponse("译文为空".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

// ============================================================================
// OpenAI
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI Chat Completions 翻译器
pub struct OpenAiTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiTranslator {
    pub fn new(
        settings: &ProviderSettings,
        api_key: &str,
        temperature: f32,
        timeout: Duration,
    ) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature,
            system_prompt: prompts::system_prompt(prompts::OPENAI_SYSTEM_PROMPT),
        })
    }
}

impl Translator for OpenAiTranslator {
    fn name(&self) -> &str {
        "openai"
    }

    fn translate(&self, text: &str) -> TranslationResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let body: ChatResponse = check_status(response)?
            .json()
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslationError::InvalidResponse("响应中没有 choices".to_string()))?;

        non_empty(content)
    }
}

// ============================================================================
// Anthropic
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Anthropic Messages 翻译器
pub struct AnthropicTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl AnthropicTranslator {
    pub fn new(
        settings: &ProviderSettings,
        api_key: &str,
        temperature: f32,
        timeout: Duration,
    ) -> TranslationResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: format!("{}/v1/messages", settings.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature,
            system_prompt: prompts::system_prompt(prompts::ANTHROPIC_SYSTEM_PROMPT),
        })
    }
}

impl Translator for AnthropicTranslator {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn translate(&self, text: &str) -> TranslationResult<String> {
        let user_message = format!("{}{}", prompts::ANTHROPIC_USER_PREFIX, text);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: &self.system_prompt,
            messages: vec![ChatMessage {
                role: "user",
                content: &user_message,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", constants::ANTHROPIC_VERSION)
            .json(&request)
            .send()?;

        let body: MessagesResponse = check_status(response)?
            .json()
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let text = body
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        non_empty(text)
    }
}
