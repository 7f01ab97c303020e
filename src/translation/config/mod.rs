//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{
    load_dotenv, BatchMode, ConfigManager, MisalignmentPolicy, ProviderKind, ProviderSettings,
    TranslationConfig,
};

/// 配置常量
pub mod constants {
    // 批次处理相关
    pub const DEFAULT_BATCH_MAX_CHARS: usize = 3000;
    pub const DEFAULT_BATCH_MAX_ITEMS: usize = 10;
    pub const BATCH_DELIMITER: &str = "\n\n---\n\n";

    // 文本过滤相关
    /// 去除首尾空白后不超过该长度的文本直接跳过
    pub const MAX_SKIPPED_LENGTH: usize = 2;
    /// 符号密度规则只对超过该长度的文本生效
    pub const DENSITY_MIN_LENGTH: usize = 10;
    pub const SPECIAL_CHAR_THRESHOLD: f32 = 0.15;
    pub const TARGET_SCRIPT_THRESHOLD: f32 = 0.5;
    pub const CODE_SYMBOLS: &[char] = &['{', '}', '[', ']', '(', ')', ';', '=', '<', '>'];

    // 默认API设置
    pub const DEFAULT_TARGET_LANG: &str = "ko";
    pub const DEFAULT_TEMPERATURE: f32 = 0.1;
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
    pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_OPENAI_MAX_TOKENS: u32 = 2000;
    pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
    pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
    pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 4000;
    pub const ANTHROPIC_VERSION: &str = "2023-06-01";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

    // 原样保留的元素：祖先中出现即跳过
    pub const VERBATIM_ELEMENTS: &[&str] = &["code", "pre", "kbd", "samp"];

    // 不承载正文的元素
    pub const NON_CONTENT_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "head", "title", "svg", "math",
    ];

    // 代码高亮使用的类名
    pub const CODE_CLASSES: &[&str] = &["code", "highlight", "hljs"];
    pub const CODE_CLASS_PREFIXES: &[&str] = &["language-"];

    // 等宽字体
    pub const MONOSPACE_FONTS: &[&str] = &[
        "monospace",
        "courier",
        "consolas",
        "monaco",
        "menlo",
        "dejavu sans mono",
        "liberation mono",
        "source code pro",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "bookbinder.toml",
        ".bookbinder.toml",
        "~/.config/bookbinder/translation.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
