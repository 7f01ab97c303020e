//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量管理。每个变量是一个实现了 [`EnvVar`] 的零尺寸类型，
//! 自带名称、默认值、说明和解析逻辑。

use std::env;
use std::fmt;
use std::path::PathBuf;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    /// 同义的旧名称，按顺序查找
    const ALIASES: &'static [&'static str] = &[];
    const DEFAULT: Option<T>;
    /// 无法写成常量的默认值（字符串、路径），取值时同样经过 `parse`
    const DEFAULT_TEXT: Option<&'static str> = None;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 读取原始值，空字符串视为未设置
    fn raw() -> Option<String> {
        std::iter::once(Self::NAME)
            .chain(Self::ALIASES.iter().copied())
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }

    fn get() -> EnvResult<T> {
        match Self::raw() {
            Some(value) => Self::parse(&value),
            None => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else if let Some(text) = Self::DEFAULT_TEXT {
                    Self::parse(text)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 未设置时返回 `Ok(None)`，设置了但无效时返回错误
    fn get_opt() -> EnvResult<Option<T>> {
        Self::raw().map(|value| Self::parse(&value)).transpose()
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志过滤规则
    pub struct LogFilter;
    impl EnvVar<String> for LogFilter {
        const NAME: &'static str = "BOOK_LOG";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("info");
        const DESCRIPTION: &'static str =
            "Tracing filter, e.g. info or bookbinder::translation=debug";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 启用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 目录与文件路径
pub mod paths {
    use super::*;

    /// 片段源目录
    pub struct SrcDir;
    impl EnvVar<PathBuf> for SrcDir {
        const NAME: &'static str = "BOOK_SRC_DIR";
        const ALIASES: &'static [&'static str] = &["SRC_DIR"];
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Directory tree holding the .docx fragments (required)";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }

    /// 中间产物目录
    pub struct WorkDir;
    impl EnvVar<PathBuf> for WorkDir {
        const NAME: &'static str = "BOOK_WORK_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("work");
        const DESCRIPTION: &'static str = "Directory for intermediate artifacts and tm.json";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }

    /// 输出目录
    pub struct OutputDir;
    impl EnvVar<PathBuf> for OutputDir {
        const NAME: &'static str = "BOOK_OUTPUT_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("output");
        const DESCRIPTION: &'static str = "Directory receiving the final PDF";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }

    /// 封面与目录素材目录
    pub struct AssetsDir;
    impl EnvVar<PathBuf> for AssetsDir {
        const NAME: &'static str = "BOOK_ASSETS_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("assets");
        const DESCRIPTION: &'static str = "Directory holding optional cover.docx and toc.docx";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }

    /// 目录规格文件
    pub struct TocFile;
    impl EnvVar<PathBuf> for TocFile {
        const NAME: &'static str = "BOOK_TOC_FILE";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str =
            "TOML table-of-contents spec (default: <src>/toc.toml, then the built-in order)";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }

    /// Chrome 可执行文件
    pub struct ChromePath;
    impl EnvVar<PathBuf> for ChromePath {
        const NAME: &'static str = "BOOK_CHROME_PATH";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str =
            "Chromium executable (default: chromium, chromium-browser or google-chrome on PATH)";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value, Self::NAME)
        }
    }
}

/// 书籍元数据
pub mod book {
    use super::*;

    /// 书名
    pub struct Title;
    impl EnvVar<String> for Title {
        const NAME: &'static str = "BOOK_TITLE";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("Agentic Design Patterns");
        const DESCRIPTION: &'static str = "Book title used for the synthetic cover and page header";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 副标题
    pub struct Subtitle;
    impl EnvVar<String> for Subtitle {
        const NAME: &'static str = "BOOK_SUBTITLE";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("Korean Edition (Auto-compiled)");
        const DESCRIPTION: &'static str = "Subtitle paragraph of the synthetic cover";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// PDF 文件名
    pub struct PdfName;
    impl EnvVar<String> for PdfName {
        const NAME: &'static str = "BOOK_PDF_NAME";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("Agentic_Design_Patterns_KO.pdf");
        const DESCRIPTION: &'static str =
            "Output PDF file name; %title% and %timestamp% are substituted";

        fn parse(value: &str) -> EnvResult<String> {
            let name = parse_non_empty(value, Self::NAME)?;
            if name.contains('/') || name.contains('\\') {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Must be a file name, not a path".to_string(),
                });
            }
            Ok(name)
        }
    }
}

/// 翻译服务相关环境变量
pub mod provider {
    use super::*;
    use crate::translation::config::ProviderKind;

    /// 使用的翻译服务
    pub struct Provider;
    impl EnvVar<ProviderKind> for Provider {
        const NAME: &'static str = "BOOK_PROVIDER";
        const DEFAULT: Option<ProviderKind> = Some(ProviderKind::Anthropic);
        const DESCRIPTION: &'static str = "Translation provider: anthropic or openai";

        fn parse(value: &str) -> EnvResult<ProviderKind> {
            value.parse().map_err(|message| EnvError {
                variable: Self::NAME.to_string(),
                message,
            })
        }
    }

    /// OpenAI API 密钥
    pub struct OpenAiApiKey;
    impl EnvVar<String> for OpenAiApiKey {
        const NAME: &'static str = "OPENAI_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key for the OpenAI provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// OpenAI 模型
    pub struct OpenAiModel;
    impl EnvVar<String> for OpenAiModel {
        const NAME: &'static str = "OPENAI_MODEL";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("gpt-4o");
        const DESCRIPTION: &'static str = "Chat completions model";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// OpenAI API 地址
    pub struct OpenAiBaseUrl;
    impl EnvVar<String> for OpenAiBaseUrl {
        const NAME: &'static str = "OPENAI_BASE_URL";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("https://api.openai.com/v1");
        const DESCRIPTION: &'static str = "Base URL; requests go to {base}/chat/completions";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// Anthropic API 密钥
    pub struct AnthropicApiKey;
    impl EnvVar<String> for AnthropicApiKey {
        const NAME: &'static str = "ANTHROPIC_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key for the Anthropic provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// Anthropic 模型
    pub struct AnthropicModel;
    impl EnvVar<String> for AnthropicModel {
        const NAME: &'static str = "ANTHROPIC_MODEL";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("claude-3-5-sonnet-latest");
        const DESCRIPTION: &'static str = "Messages API model";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// Anthropic API 地址
    pub struct AnthropicBaseUrl;
    impl EnvVar<String> for AnthropicBaseUrl {
        const NAME: &'static str = "ANTHROPIC_BASE_URL";
        const DEFAULT: Option<String> = None;
        const DEFAULT_TEXT: Option<&'static str> = Some("https://api.anthropic.com");
        const DESCRIPTION: &'static str = "Base URL; requests go to {base}/v1/messages";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }
}

/// 批次相关环境变量
pub mod batch {
    use super::*;
    use crate::translation::config::{BatchMode, MisalignmentPolicy};

    /// 翻译提交方式
    pub struct Mode;
    impl EnvVar<BatchMode> for Mode {
        const NAME: &'static str = "BOOK_BATCH_MODE";
        const DEFAULT: Option<BatchMode> = Some(BatchMode::PerNode);
        const DESCRIPTION: &'static str = "per-node (one request per text) or batch";

        fn parse(value: &str) -> EnvResult<BatchMode> {
            value.parse().map_err(|message| EnvError {
                variable: Self::NAME.to_string(),
                message,
            })
        }
    }

    /// 批次字符预算
    pub struct MaxChars;
    impl EnvVar<usize> for MaxChars {
        const NAME: &'static str = "BOOK_BATCH_MAX_CHARS";
        const DEFAULT: Option<usize> = Some(3000);
        const DESCRIPTION: &'static str = "Cumulative character budget per batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 100, 100_000)
        }
    }

    /// 批次条目上限
    pub struct MaxItems;
    impl EnvVar<usize> for MaxItems {
        const NAME: &'static str = "BOOK_BATCH_MAX_ITEMS";
        const DEFAULT: Option<usize> = Some(10);
        const DESCRIPTION: &'static str = "Maximum texts per batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 200)
        }
    }

    /// 批次响应段数不符时的处理方式
    pub struct Misalignment;
    impl EnvVar<MisalignmentPolicy> for Misalignment {
        const NAME: &'static str = "BOOK_MISALIGNMENT";
        const DEFAULT: Option<MisalignmentPolicy> = Some(MisalignmentPolicy::FallbackPerNode);
        const DESCRIPTION: &'static str =
            "Batch response with wrong segment count: fallback, drop or fail";

        fn parse(value: &str) -> EnvResult<MisalignmentPolicy> {
            value.parse().map_err(|message| EnvError {
                variable: Self::NAME.to_string(),
                message,
            })
        }
    }
}

// 辅助函数

fn parse_non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_path(value: &str, var_name: &str) -> EnvResult<PathBuf> {
    let trimmed = parse_non_empty(value, var_name)?;
    Ok(PathBuf::from(shellexpand::tilde(&trimmed).as_ref()))
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let url = value.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "URL must start with http:// or https://".to_string(),
        })
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn doc_line<T: fmt::Debug, V: EnvVar<T>>() -> String {
    let default = match (V::DEFAULT, V::DEFAULT_TEXT) {
        (Some(value), _) => format!("{:?}", value),
        (None, Some(text)) => format!("{:?}", text),
        (None, None) => "unset".to_string(),
    };
    let aliases = if V::ALIASES.is_empty() {
        String::new()
    } else {
        format!(" (alias: {})", V::ALIASES.join(", "))
    };
    format!(
        "- `{}`{}: {} (default: {})\n",
        V::NAME,
        aliases,
        V::DESCRIPTION,
        default
    )
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");
    docs.push_str("`.env.local`, `.env` are loaded first when present.\n\n");

    docs.push_str("## Paths\n\n");
    docs.push_str(&doc_line::<PathBuf, paths::SrcDir>());
    docs.push_str(&doc_line::<PathBuf, paths::WorkDir>());
    docs.push_str(&doc_line::<PathBuf, paths::OutputDir>());
    docs.push_str(&doc_line::<PathBuf, paths::AssetsDir>());
    docs.push_str(&doc_line::<PathBuf, paths::TocFile>());
    docs.push_str(&doc_line::<PathBuf, paths::ChromePath>());

    docs.push_str("\n## Book\n\n");
    docs.push_str(&doc_line::<String, book::Title>());
    docs.push_str(&doc_line::<String, book::Subtitle>());
    docs.push_str(&doc_line::<String, book::PdfName>());

    docs.push_str("\n## Translation Provider\n\n");
    docs.push_str(&doc_line::<_, provider::Provider>());
    docs.push_str(&doc_line::<String, provider::OpenAiApiKey>());
    docs.push_str(&doc_line::<String, provider::OpenAiModel>());
    docs.push_str(&doc_line::<String, provider::OpenAiBaseUrl>());
    docs.push_str(&doc_line::<String, provider::AnthropicApiKey>());
    docs.push_str(&doc_line::<String, provider::AnthropicModel>());
    docs.push_str(&doc_line::<String, provider::AnthropicBaseUrl>());

    docs.push_str("\n## Batching\n\n");
    docs.push_str(&doc_line::<_, batch::Mode>());
    docs.push_str(&doc_line::<usize, batch::MaxChars>());
    docs.push_str(&doc_line::<usize, batch::MaxItems>());
    docs.push_str(&doc_line::<_, batch::Misalignment>());

    docs.push_str("\n## Logging\n\n");
    docs.push_str(&doc_line::<String, core::LogFilter>());
    docs.push_str(&doc_line::<bool, core::NoColor>());

    docs
}
