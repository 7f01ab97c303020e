use std::fs;
use std::io;
use std::path::Path;

use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{RcDom, SerializableHandle};

use super::dom::html_to_dom;

/// 序列化文档为 UTF-8 字节
pub fn serialize_document(dom: &RcDom) -> io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;
    Ok(buf)
}

/// 读取 HTML 文件并解析为 DOM
pub fn read_html_file(path: &Path) -> io::Result<RcDom> {
    let data = fs::read(path)?;
    html_to_dom(&data, "utf-8")
}

/// 序列化 DOM 并写入文件，按需创建父目录
pub fn write_html_file(dom: &RcDom, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serialize_document(dom)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserialization_is_stable() {
        let source = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
                      <body><p>Hello <b>world</b></p></body></html>";
        let first = serialize_document(&html_to_dom(source.as_bytes(), "utf-8").unwrap()).unwrap();
        let second = serialize_document(&html_to_dom(&first, "utf-8").unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work").join("out.html");
        let dom = html_to_dom(b"<p>x</p>", "utf-8").unwrap();

        write_html_file(&dom, &path).unwrap();
        let reread = read_html_file(&path).unwrap();
        assert_eq!(
            serialize_document(&reread).unwrap(),
            serialize_document(&dom).unwrap()
        );
    }
}
