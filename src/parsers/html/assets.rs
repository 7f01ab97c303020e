//! HTML 静态资源处理模块
//!
//! 把 `<img>` 引用的本地图片转换为 data URL 嵌入文档，使最终 HTML 不再依赖同目录下的
//! `media/` 文件。已经是 data URL 或带协议的远程地址保持不变。

use std::fs;
use std::io;
use std::path::Path;

use markup5ever_rcdom::RcDom;

use crate::utils::url::{create_data_url, detect_image_media_type, resolve_local_src};

use super::dom::{find_nodes, get_node_attr, set_node_attr};

/// 嵌入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStats {
    /// 成功嵌入的图片
    pub inlined: usize,
    /// 文件不存在而跳过的图片
    pub missing: usize,
    /// 读取失败的图片
    pub failed: usize,
}

/// 将 `base_dir` 下的相对图片路径替换为 data URL
pub fn inline_images(dom: &RcDom, base_dir: &Path) -> InlineStats {
    let mut stats = InlineStats::default();

    for img in find_nodes(&dom.document, &["img"]) {
        let Some(src) = get_node_attr(&img, "src") else {
            continue;
        };
        let Some(path) = resolve_local_src(base_dir, &src) else {
            continue;
        };

        if !path.is_file() {
            tracing::debug!("图片不存在，跳过: {}", path.display());
            stats.missing += 1;
            continue;
        }

        match read_image(&path) {
            Ok(data_url) => {
                set_node_attr(&img, "src", Some(data_url));
                stats.inlined += 1;
            }
            Err(e) => {
                tracing::warn!("读取图片失败 {}: {}", path.display(), e);
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        "图片嵌入完成: {} 张嵌入, {} 张缺失, {} 张失败",
        stats.inlined,
        stats.missing,
        stats.failed
    );
    stats
}

fn read_image(path: &Path) -> io::Result<String> {
    let data = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(create_data_url(detect_image_media_type(&data, &name), &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_inline_relative_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("media")).unwrap();
        fs::write(dir.path().join("media").join("fig 1.png"), b"\x89PNG\x0D\x0A\x1A\x0A").unwrap();

        let dom = html_to_dom(
            b"<img src=\"media/fig%201.png\"><img src=\"media/gone.png\">\
              <img src=\"https://example.com/x.png\"><img src=\"data:image/gif;base64,R0lG\">",
            "utf-8",
        )
        .unwrap();

        let stats = inline_images(&dom, dir.path());
        assert_eq!(stats.inlined, 1);
        assert_eq!(stats.missing, 1);

        let srcs: Vec<String> = find_nodes(&dom.document, &["img"])
            .iter()
            .filter_map(|img| get_node_attr(img, "src"))
            .collect();
        assert!(srcs[0].starts_with("data:image/png;base64,"));
        assert_eq!(srcs[1], "media/gone.png");
        assert_eq!(srcs[2], "https://example.com/x.png");
        assert_eq!(srcs[3], "data:image/gif;base64,R0lG");
    }
}
