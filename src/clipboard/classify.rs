//! 剪贴板 / 拖放内容分类
//!
//! # 设计思路
//!
//! 系统剪贴板与拖放都只给出原始文本，本模块负责把它们归类为货架条目：
//!
//! - 每一行都是 `file://` URI 或存在的绝对路径 → 文件列表
//! - 以 `http://`、`https://`、`www.` 开头 → 链接（拖放只认前两种）
//! - 其余非空文本 → 文本
//!
//! # 实现思路
//!
//! - 前缀判断使用 `once_cell::sync::Lazy` 预编译的正则，首次调用时编译。
//! - `file://` URI 交给 `reqwest::Url` 解析并转换为本地路径，非法转义按原样保留。
//! - 路径存在性检查以闭包注入，单元测试无需真实文件。

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::ClipboardPayload;
use crate::shelf::ItemContent;

/// 剪贴板捕获认可的链接前缀
static CLIPBOARD_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://|www\.)\S").expect("静态正则表达式")
});

/// 拖放认可的链接前缀
static DROP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://\S").expect("静态正则表达式"));

/// 剪贴板文本分类；空白文本返回 `None`
pub fn classify_clipboard_text(text: &str) -> Option<ClipboardPayload> {
    classify_with(text, &CLIPBOARD_URL, |path| path.exists())
}

/// 拖放文本分类；空白文本返回 `None`
pub fn classify_drop_text(text: &str) -> Option<ClipboardPayload> {
    classify_with(text, &DROP_URL, |path| path.exists())
}

pub(crate) fn classify_with<F>(text: &str, url: &Regex, exists: F) -> Option<ClipboardPayload>
where
    F: Fn(&Path) -> bool,
{
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(files) = parse_file_list(trimmed, exists) {
        return Some(ClipboardPayload::Files(files));
    }
    if url.is_match(trimmed) {
        return Some(ClipboardPayload::Url(trimmed.to_string()));
    }
    Some(ClipboardPayload::Text(trimmed.to_string()))
}

/// 所有非空行都能解析为本地文件时返回路径列表
fn parse_file_list<F>(text: &str, exists: F) -> Option<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let is_uri = line.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"));
        let path = if is_uri {
            file_uri_to_path(line)?
        } else {
            let path = PathBuf::from(line);
            if !path.is_absolute() || !exists(&path) {
                return None;
            }
            path
        };
        if !files.contains(&path) {
            files.push(path);
        }
    }
    (!files.is_empty()).then_some(files)
}

/// `file://` URI 转本地路径；主机不是本机或解析失败时返回 `None`
fn file_uri_to_path(line: &str) -> Option<PathBuf> {
    reqwest::Url::parse(line)
        .ok()
        .filter(|url| url.scheme() == "file")?
        .to_file_path()
        .ok()
}

impl ClipboardPayload {
    /// 展开为待添加的条目内容
    pub fn into_contents(self) -> Vec<ItemContent> {
        match self {
            Self::Files(files) => files.into_iter().map(ItemContent::File).collect(),
            Self::Url(url) => vec![ItemContent::Url(url)],
            Self::Text(text) => vec![ItemContent::Text(text)],
        }
    }
}
