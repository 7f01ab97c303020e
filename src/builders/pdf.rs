//! PDF 渲染
//!
//! 页面尺寸、页边距和页眉页脚写成 `@page` 样式表注入到打印副本中，
//! 再交给无头 Chromium 的 `--print-to-pdf` 输出。

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use cssparser::serialize_string;
use thiserror::Error;

use crate::env::{paths, EnvVar};
use crate::parsers::html::{
    append_child, append_text, get_child_node_by_name, new_element, read_html_file,
    write_html_file,
};
use crate::utils::url::file_url;

/// 依次在 PATH 中查找的可执行文件
pub const CHROME_CANDIDATES: &[&str] = &["chromium", "chromium-browser", "google-chrome"];

/// 渲染错误
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("找不到 Chromium 可执行文件，请设置 BOOK_CHROME_PATH")]
    ChromeNotFound,

    #[error("无法读写 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法启动 {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} 退出状态 {status}: {stderr}", .program.display())]
    Failed {
        program: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("渲染结束但没有生成 {}", .0.display())]
    NoOutput(PathBuf),

    #[error("无法生成 file URL: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// 页面版式
///
/// 页眉页脚模板中 `{page}`、`{pages}` 会替换为当前页码和总页数。
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub size: String,
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub margin_right: String,
    pub header: String,
    pub footer: String,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            size: "A4".to_string(),
            margin_top: "1in".to_string(),
            margin_bottom: "1in".to_string(),
            margin_left: "0.8in".to_string(),
            margin_right: "0.8in".to_string(),
            header: String::new(),
            footer: "{page} / {pages}".to_string(),
        }
    }
}

impl PageLayout {
    /// 以书名作为页眉
    pub fn for_title(title: &str) -> Self {
        Self {
            header: title.to_string(),
            ..Self::default()
        }
    }

    /// 生成 `@page` 样式表
    pub fn stylesheet(&self) -> String {
        let mut css = format!(
            "@page {{\n  size: {};\n  margin: {} {} {} {};\n",
            self.size, self.margin_top, self.margin_right, self.margin_bottom, self.margin_left
        );
        if !self.header.is_empty() {
            css.push_str(&format!(
                "  @top-center {{ content: {}; font-size: 9pt; }}\n",
                template_content(&self.header)
            ));
        }
        if !self.footer.is_empty() {
            css.push_str(&format!(
                "  @bottom-center {{ content: {}; font-size: 9pt; }}\n",
                template_content(&self.footer)
            ));
        }
        css.push_str("}\n");
        css
    }
}

/// 把模板转换为 CSS `content` 值
fn template_content(template: &str) -> String {
    let mut parts = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        let next = [("{pages}", "counter(pages)"), ("{page}", "counter(page)")]
            .iter()
            .filter_map(|(token, counter)| rest.find(token).map(|at| (at, *token, *counter)))
            .min_by_key(|(at, token, _)| (*at, std::cmp::Reverse(token.len())));

        match next {
            Some((at, token, counter)) => {
                if at > 0 {
                    parts.push(css_string(&rest[..at]));
                }
                parts.push(counter.to_string());
                rest = &rest[at + token.len()..];
            }
            None => {
                parts.push(css_string(rest));
                rest = "";
            }
        }
    }

    parts.join(" ")
}

fn css_string(text: &str) -> String {
    let mut out = String::new();
    if serialize_string(text, &mut out).is_err() {
        return "\"\"".to_string();
    }
    out
}

/// 渲染器接口
pub trait Renderer {
    fn render(&self, html: &Path, pdf: &Path, layout: &PageLayout) -> Result<(), RenderError>;
}

/// 无头 Chromium 渲染器
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的可执行文件
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
        }
    }

    /// 可执行文件：显式指定，其次 `BOOK_CHROME_PATH`，最后在 PATH 中查找
    pub fn executable(&self) -> Result<PathBuf, RenderError> {
        if let Some(executable) = &self.executable {
            return Ok(executable.clone());
        }
        if let Ok(Some(path)) = paths::ChromePath::get_opt() {
            return Ok(path);
        }
        find_on_path(CHROME_CANDIDATES).ok_or(RenderError::ChromeNotFound)
    }
}

fn find_on_path(candidates: &[&str]) -> Option<PathBuf> {
    let search = env::var_os("PATH")?;
    candidates.iter().find_map(|name| {
        env::split_paths(&search)
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    })
}

/// 打印副本的路径：`book.html` -> `book.print.html`
pub fn print_copy_path(html: &Path) -> PathBuf {
    let stem = html
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    html.with_file_name(format!("{}.print.html", stem))
}

/// 写出注入了 `@page` 样式的打印副本
pub fn write_print_copy(html: &Path, layout: &PageLayout) -> Result<PathBuf, RenderError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| RenderError::Io { path, source }
    };

    let dom = read_html_file(html).map_err(io_err(html))?;
    let head = get_child_node_by_name(&dom.document, "html")
        .and_then(|root| get_child_node_by_name(&root, "head"));
    match head {
        Some(head) => {
            let style = new_element(&dom, "style", &[("id", "bookbinder-page")]);
            append_text(&dom, &style, &layout.stylesheet());
            append_child(&dom, &head, style);
        }
        None => tracing::warn!("{} 没有 head，按默认版式打印", html.display()),
    }

    let copy = print_copy_path(html);
    write_html_file(&dom, &copy).map_err(io_err(&copy))?;
    Ok(copy)
}

impl Renderer for ChromiumRenderer {
    fn render(&self, html: &Path, pdf: &Path, layout: &PageLayout) -> Result<(), RenderError> {
        let program = self.executable()?;

        if let Some(dir) = pdf.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let copy = write_print_copy(html, layout)?;
        let url = file_url(&copy).ok_or_else(|| RenderError::InvalidPath(copy.clone()))?;

        tracing::info!("渲染 PDF: {} -> {}", html.display(), pdf.display());
        tracing::debug!("使用 {}", program.display());

        let output = Command::new(&program)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", pdf.display()))
            .arg(url.as_str())
            .output()
            .map_err(|source| RenderError::Launch {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !pdf.is_file() {
            return Err(RenderError::NoOutput(pdf.to_path_buf()));
        }

        tracing::info!("已生成 {}", pdf.display());
        Ok(())
    }
}
