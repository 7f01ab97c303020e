//! 自然排序
//!
//! "Chapter 2" 排在 "Chapter 10" 之前：数字段按整数比较，其余段按小写字符串比较。

use std::cmp::Ordering;

/// 排序键的一个片段
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    Number(u128),
}

/// 自然排序键
///
/// 键总是以文本段开头（可能为空），随后文本段与数字段交替出现，
/// 因此同一位置上比较的总是同类片段。
pub type NaturalKey = Vec<KeyPart>;

/// 计算字符串的自然排序键
pub fn natural_key(s: &str) -> NaturalKey {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            if digits.is_empty() {
                parts.push(KeyPart::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                parts.push(KeyPart::Number(parse_digits(&digits)));
                digits.clear();
            }
            text.push(ch);
        }
    }

    if !digits.is_empty() {
        parts.push(KeyPart::Number(parse_digits(&digits)));
        parts.push(KeyPart::Text(String::new()));
    } else {
        parts.push(KeyPart::Text(text.to_lowercase()));
    }

    parts
}

fn parse_digits(digits: &str) -> u128 {
    digits.parse().unwrap_or(u128::MAX)
}

/// 按自然顺序比较两个字符串
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}
