//! CSS 解析器模块
//!
//! 解析行内 `style` 声明。转换器用它生成字体声明，分类器用它读取祖先元素声明的字体族，
//! 从而识别等宽字体中的代码文本。

use cssparser::{serialize_identifier, serialize_string, Parser, ParserInput, Token};

/// 读取 `style` 属性中声明的 `font-family`
///
/// 返回小写、以 `", "` 连接的字体族列表；同一属性声明多次时以最后一次为准。
/// 没有声明时返回 `None`。
///
/// ```
/// use bookbinder::parsers::css::declared_font_family;
///
/// let family = declared_font_family("color: red; font-family: 'Courier New', monospace");
/// assert_eq!(family.as_deref(), Some("courier new, monospace"));
/// ```
pub fn declared_font_family(style: &str) -> Option<String> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);

    let mut result = None;
    let mut property: Option<String> = None;
    let mut in_value = false;
    let mut families: Vec<String> = Vec::new();
    let mut words: Vec<String> = Vec::new();

    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        if !in_value {
            match token {
                Token::Ident(name) => property = Some(name.to_ascii_lowercase()),
                Token::Colon => in_value = property.as_deref() == Some("font-family"),
                Token::Semicolon => property = None,
                _ => {}
            }
            continue;
        }

        match token {
            // 不加引号的多词字体名由多个标识符组成
            Token::Ident(word) => words.push(word.to_lowercase()),
            Token::QuotedString(name) => families.push(name.trim().to_lowercase()),
            Token::Comma => flush_words(&mut words, &mut families),
            Token::Semicolon => {
                flush_words(&mut words, &mut families);
                if !families.is_empty() {
                    result = Some(families.join(", "));
                }
                families.clear();
                property = None;
                in_value = false;
            }
            _ => {}
        }
    }

    if in_value {
        flush_words(&mut words, &mut families);
        if !families.is_empty() {
            result = Some(families.join(", "));
        }
    }

    result
}

fn flush_words(words: &mut Vec<String>, families: &mut Vec<String>) {
    if !words.is_empty() {
        families.push(words.join(" "));
        words.clear();
    }
}

/// 生成 `font-family` 声明的值
///
/// 单个标识符原样输出，含空格的名称加引号。
pub fn format_font_family(name: &str) -> String {
    let name = name.trim();
    let mut out = String::new();
    let is_ident = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    let written = if is_ident {
        serialize_identifier(name, &mut out)
    } else {
        serialize_string(name, &mut out)
    };

    match written {
        Ok(()) => out,
        Err(_) => format!("\"{}\"", name.replace('"', "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_family_list() {
        assert_eq!(
            declared_font_family("font-family: Consolas, \"Courier New\", monospace").as_deref(),
            Some("consolas, courier new, monospace")
        );
    }

    #[test]
    fn test_unquoted_multi_word_family() {
        assert_eq!(
            declared_font_family("font-family: Source Code Pro; color: #333").as_deref(),
            Some("source code pro")
        );
    }

    #[test]
    fn test_no_font_family() {
        assert_eq!(declared_font_family("color: red; margin: 0"), None);
        assert_eq!(declared_font_family(""), None);
        assert_eq!(declared_font_family("font-family:"), None);
    }

    #[test]
    fn test_last_declaration_wins() {
        assert_eq!(
            declared_font_family("font-family: Georgia; font-family: Menlo").as_deref(),
            Some("menlo")
        );
    }

    #[test]
    fn test_format_font_family() {
        assert_eq!(format_font_family("Consolas"), "Consolas");
        assert_eq!(format_font_family("Courier New"), "\"Courier New\"");
        let style = format!("font-family: {}", format_font_family("Courier New"));
        assert_eq!(declared_font_family(&style).as_deref(), Some("courier new"));
    }
}
