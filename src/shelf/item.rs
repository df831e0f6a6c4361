//! 条目数据模型
//!
//! ## 职责
//! - 定义条目类型 `ItemKind` 与带类型的内容 `ItemContent`（Text / Url / File 三选一）
//! - 定义货架条目 `Item` 与新增参数 `NewItem`
//! - 提供标签归一化工具
//!
//! ## 不变量
//! - `(kind, content)` 即条目身份，`ItemContent` 直接作为仓库内的查找键
//! - `hidden_from_main == true` 蕴含 `is_favorite == true`

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Url,
    File,
}

impl ItemKind {
    /// 稳定的类型标签，用于快照与排序
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条目内容：类型与内容绑定在一起，创建后类型不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemContent {
    Text(String),
    Url(String),
    /// 绝对路径
    File(PathBuf),
}

impl ItemContent {
    pub fn new(kind: ItemKind, content: impl Into<String>) -> Self {
        let content = content.into();
        match kind {
            ItemKind::Text => Self::Text(content),
            ItemKind::Url => Self::Url(content),
            ItemKind::File => Self::File(PathBuf::from(content)),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn url(content: impl Into<String>) -> Self {
        Self::Url(content.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Text(_) => ItemKind::Text,
            Self::Url(_) => ItemKind::Url,
            Self::File(_) => ItemKind::File,
        }
    }

    /// 内容的字符串形式（文件取路径的有损 UTF-8 表示）
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) | Self::Url(text) => Cow::Borrowed(text.as_str()),
            Self::File(path) => path.to_string_lossy(),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl fmt::Display for ItemContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.as_str())
    }
}

/// 货架条目
///
/// 标记位只能经由 [`ItemStore`](super::ItemStore) 修改，以保证
/// “隐藏必为收藏”的不变量；外部只读访问。
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) content: ItemContent,
    pub(crate) is_favorite: bool,
    pub(crate) hidden_from_main: bool,
    pub(crate) tags: Vec<String>,
    pub(crate) date_added: DateTime<Utc>,
    pub(crate) use_count: u64,
    pub(crate) title: Option<String>,
    /// 批量选择模式下的临时状态，不持久化
    pub(crate) selected: bool,
}

impl Item {
    pub(crate) fn from_new(new: NewItem) -> Self {
        let is_favorite = new.is_favorite;
        Self {
            content: new.content,
            is_favorite,
            hidden_from_main: new.hidden_from_main && is_favorite,
            tags: normalize_tags(new.tags),
            date_added: new.date_added.unwrap_or_else(Utc::now),
            use_count: new.use_count,
            title: new.title,
            selected: false,
        }
    }

    pub fn content(&self) -> &ItemContent {
        &self.content
    }

    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn hidden_from_main(&self) -> bool {
        self.hidden_from_main
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// 展示用名称：文件取文件名，链接优先取已抓取的标题
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.content {
            ItemContent::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy()),
            ItemContent::Url(url) => match self.title.as_deref() {
                Some(title) if !title.is_empty() => Cow::Borrowed(title),
                _ => Cow::Borrowed(url.as_str()),
            },
            ItemContent::Text(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

/// `ItemStore::add` 的参数
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub content: ItemContent,
    pub is_favorite: bool,
    pub hidden_from_main: bool,
    pub tags: Vec<String>,
    /// 为 `None` 时取当前时间
    pub date_added: Option<DateTime<Utc>>,
    pub use_count: u64,
    pub title: Option<String>,
}

impl NewItem {
    pub fn new(content: ItemContent) -> Self {
        Self {
            content,
            is_favorite: false,
            hidden_from_main: false,
            tags: Vec::new(),
            date_added: None,
            use_count: 0,
            title: None,
        }
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub fn hidden_from_main(mut self, hidden: bool) -> Self {
        self.hidden_from_main = hidden;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = Some(date_added);
        self
    }

    pub fn use_count(mut self, use_count: u64) -> Self {
        self.use_count = use_count;
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

impl From<&Item> for NewItem {
    /// 按原样重建条目（撤销恢复用）
    fn from(item: &Item) -> Self {
        Self {
            content: item.content.clone(),
            is_favorite: item.is_favorite,
            hidden_from_main: item.hidden_from_main,
            tags: item.tags.clone(),
            date_added: Some(item.date_added),
            use_count: item.use_count,
            title: item.title.clone(),
        }
    }
}

/// 标签归一化：去首尾空白、丢弃空标签、去重并保持首次出现的顺序
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || result.iter().any(|existing| existing == tag) {
            continue;
        }
        result.push(tag.to_string());
    }
    result
}
