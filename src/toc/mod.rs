//! 片段排序模块
//!
//! 根据声明式目录规格，把源目录中的 `.docx` 片段解析为唯一、确定的顺序。
//!
//! - `spec`: 目录规格（内置默认值与 TOML 覆盖）
//! - `natural`: 自然排序键
//! - `resolver`: 扫描源目录并生成有序片段列表

pub mod natural;
pub mod resolver;
pub mod spec;

pub use natural::{natural_cmp, natural_key, NaturalKey};
pub use resolver::{build_order, Fragment, OrderedFragments, ResolutionWarning};
pub use spec::{GroupKind, TocEntry, TocSpec};
