//! 视图过滤 / 排序引擎
//!
//! ## 设计思路
//!
//! 可见列表是 `(items, tab, type_filter, sort_key, sort_ascending, query)` 的纯函数，
//! 本模块不持有任何可变状态。收藏 / 全部两个标签页只是同一份条目序列的两种视图。
//!
//! 唯一会改写存储顺序的是显式排序：排序直接重排仓库序列，
//! 因此排序会覆盖之前拖拽得到的手动顺序。
//!
//! ## 实现思路
//!
//! - 过滤顺序：标签页谓词 → 类型过滤 → 搜索（大小写不敏感，匹配内容或任一标签）。
//! - 排序比较器统一按“升序语义”定义，`sort_ascending == false` 时整体反转；
//!   使用稳定排序，相等元素保持原有相对顺序。
//! - 按大小排序前一次性探测文件大小，避免比较过程中重复 `stat`。

use std::cmp::Ordering;
use std::fs;

use serde::{Deserialize, Serialize};

use super::item::{Item, ItemKind};

/// 当前标签页
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    #[serde(rename = "fav")]
    Favorites,
    History,
}

impl Tab {
    /// 当前标签页为空时显示的提示语
    pub fn empty_hint(self) -> &'static str {
        match self {
            Self::All => "Drag items here\nor Copy (Ctrl+C)",
            Self::Favorites => "No Favorites yet",
            Self::History => "No history yet",
        }
    }

    /// 标签页谓词；历史标签页不展示仓库条目
    pub fn admits(self, item: &Item) -> bool {
        match self {
            Self::All => !item.hidden_from_main,
            Self::Favorites => item.is_favorite,
            Self::History => false,
        }
    }
}

/// 类型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    File,
    Url,
    Text,
}

impl TypeFilter {
    pub fn admits(self, kind: ItemKind) -> bool {
        match self {
            Self::All => true,
            Self::File => kind == ItemKind::File,
            Self::Url => kind == ItemKind::Url,
            Self::Text => kind == ItemKind::Text,
        }
    }
}

/// 排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Name,
    Type,
    Size,
    Used,
}

impl SortKey {
    /// 选中该排序键时的默认方向
    ///
    /// `newest`、`size`、`used` 默认降序，其余默认升序。
    pub fn default_ascending(self) -> bool {
        match self {
            Self::Newest | Self::Size | Self::Used => false,
            Self::Oldest | Self::Name | Self::Type => true,
        }
    }
}

/// 视图参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub tab: Tab,
    pub type_filter: TypeFilter,
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    pub query: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tab: Tab::All,
            type_filter: TypeFilter::All,
            sort_key: SortKey::Newest,
            sort_ascending: SortKey::Newest.default_ascending(),
            query: String::new(),
        }
    }
}

impl ViewState {
    /// 切换排序键，并把方向重置为该键的默认方向
    pub fn select_sort(&mut self, key: SortKey) {
        self.sort_key = key;
        self.sort_ascending = key.default_ascending();
    }

    pub fn toggle_direction(&mut self) {
        self.sort_ascending = !self.sort_ascending;
    }

    /// 预先小写化的搜索词，空串表示匹配全部
    pub fn normalized_query(&self) -> String {
        self.query.trim().to_lowercase()
    }
}

/// 搜索谓词：大小写不敏感地匹配内容或任一标签
pub fn matches_query(content: &str, tags: &[String], lowered_query: &str) -> bool {
    if lowered_query.is_empty() {
        return true;
    }
    content.to_lowercase().contains(lowered_query)
        || tags.iter().any(|tag| tag.to_lowercase().contains(lowered_query))
}

/// 计算可见条目在仓库序列中的下标（保持存储顺序）
pub fn visible_indices(items: &[Item], view: &ViewState) -> Vec<usize> {
    let query = view.normalized_query();
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| view.tab.admits(item))
        .filter(|(_, item)| view.type_filter.admits(item.kind()))
        .filter(|(_, item)| matches_query(&item.content.as_str(), &item.tags, &query))
        .map(|(index, _)| index)
        .collect()
}

/// 计算可见条目列表（保持存储顺序）
pub fn visible<'a>(items: &'a [Item], view: &ViewState) -> Vec<&'a Item> {
    visible_indices(items, view)
        .into_iter()
        .map(|index| &items[index])
        .collect()
}

/// 文件大小探测：缺失或非文件条目记为 0
pub fn file_size_on_disk(item: &Item) -> u64 {
    item.content
        .file_path()
        .and_then(|path| fs::metadata(path).ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .unwrap_or(0)
}

fn compare_ascending(a: &Item, b: &Item, key: SortKey) -> Ordering {
    match key {
        SortKey::Newest | SortKey::Oldest => a.date_added.cmp(&b.date_added),
        SortKey::Name => a
            .content
            .as_str()
            .to_lowercase()
            .cmp(&b.content.as_str().to_lowercase()),
        SortKey::Type => a.kind().as_str().cmp(b.kind().as_str()),
        SortKey::Used => a.use_count.cmp(&b.use_count),
        // 大小在 sort_items 中预先探测
        SortKey::Size => Ordering::Equal,
    }
}

/// 按排序键稳定排序条目序列（原地重排存储顺序）
///
/// `size_of` 用于探测文件大小，生产环境传入 [`file_size_on_disk`]。
pub fn sort_items<F>(items: &mut Vec<Item>, key: SortKey, ascending: bool, size_of: F)
where
    F: Fn(&Item) -> u64,
{
    let direct = |ordering: Ordering| if ascending { ordering } else { ordering.reverse() };

    if key == SortKey::Size {
        let mut keyed: Vec<(u64, Item)> = std::mem::take(items)
            .into_iter()
            .map(|item| (size_of(&item), item))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| direct(a.cmp(b)));
        *items = keyed.into_iter().map(|(_, item)| item).collect();
        return;
    }

    items.sort_by(|a, b| direct(compare_ascending(a, b, key)));
}

/// 拖拽重排：根据落点纵坐标计算插入位置
///
/// `rows` 为当前可见行的 `(仓库下标, 行中线纵坐标)`，按显示顺序排列。
/// 线性扫描找到第一条中线在落点之下的行，插入到它之前；
/// 若落点在所有行之下，则插入到序列末尾（返回 `len`）。
pub fn drop_index(drop_y: f64, rows: &[(usize, f64)], len: usize) -> usize {
    rows.iter()
        .find(|(_, midpoint)| drop_y < *midpoint)
        .map(|(index, _)| *index)
        .unwrap_or(len)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::shelf::item::{ItemContent, NewItem};

    fn item(content: ItemContent, minutes: i64, used: u64) -> Item {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
        Item::from_new(
            NewItem::new(content)
                .date_added(base + Duration::minutes(minutes))
                .use_count(used),
        )
    }

    fn contents(items: &[Item]) -> Vec<String> {
        items.iter().map(|i| i.content().as_str().into_owned()).collect()
    }

    #[test]
    fn tab_predicates_follow_flags() {
        let mut fav = item(ItemContent::text("fav"), 0, 0);
        fav.is_favorite = true;
        fav.hidden_from_main = true;
        let plain = item(ItemContent::text("plain"), 1, 0);
        let items = vec![fav, plain];

        let mut view = ViewState::default();
        assert_eq!(visible_indices(&items, &view), vec![1]);

        view.tab = Tab::Favorites;
        assert_eq!(visible_indices(&items, &view), vec![0]);

        view.tab = Tab::History;
        assert!(visible_indices(&items, &view).is_empty());
    }

    #[test]
    fn type_filter_and_search_apply_in_order() {
        let mut tagged = item(ItemContent::text("alpha"), 0, 0);
        tagged.tags = vec!["Work".to_string()];
        let items = vec![
            tagged,
            item(ItemContent::url("https://WORKshop.dev"), 1, 0),
            item(ItemContent::file("/docs/notes.md"), 2, 0),
        ];

        let mut view = ViewState { query: "work".to_string(), ..ViewState::default() };
        assert_eq!(visible_indices(&items, &view), vec![0, 1]);

        view.type_filter = TypeFilter::Url;
        assert_eq!(visible_indices(&items, &view), vec![1]);

        view.query.clear();
        view.type_filter = TypeFilter::File;
        assert_eq!(visible_indices(&items, &view), vec![2]);
    }

    #[test]
    fn newest_and_oldest_sort_by_date() {
        let mut items = vec![
            item(ItemContent::text("b"), 5, 0),
            item(ItemContent::text("a"), 1, 0),
            item(ItemContent::text("c"), 9, 0),
        ];
        sort_items(&mut items, SortKey::Newest, SortKey::Newest.default_ascending(), |_| 0);
        assert_eq!(contents(&items), vec!["c", "b", "a"]);

        sort_items(&mut items, SortKey::Oldest, SortKey::Oldest.default_ascending(), |_| 0);
        assert_eq!(contents(&items), vec!["a", "b", "c"]);
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let mut items = vec![
            item(ItemContent::text("banana"), 0, 0),
            item(ItemContent::text("Apple"), 0, 0),
            item(ItemContent::text("cherry"), 0, 0),
        ];
        sort_items(&mut items, SortKey::Name, true, |_| 0);
        assert_eq!(contents(&items), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn type_sort_is_stable_within_kind() {
        let mut items = vec![
            item(ItemContent::url("https://1"), 0, 0),
            item(ItemContent::text("t1"), 0, 0),
            item(ItemContent::file("/f"), 0, 0),
            item(ItemContent::text("t2"), 0, 0),
        ];
        sort_items(&mut items, SortKey::Type, true, |_| 0);
        assert_eq!(contents(&items), vec!["/f", "t1", "t2", "https://1"]);
    }

    #[test]
    fn size_sort_uses_size_lookup_and_defaults_descending() {
        let mut items = vec![
            item(ItemContent::file("/small"), 0, 0),
            item(ItemContent::text("not a file"), 0, 0),
            item(ItemContent::file("/big"), 0, 0),
        ];
        let size_of = |item: &Item| match &*item.content().as_str() {
            "/small" => 10,
            "/big" => 1000,
            _ => 0,
        };
        sort_items(&mut items, SortKey::Size, SortKey::Size.default_ascending(), size_of);
        assert_eq!(contents(&items), vec!["/big", "/small", "not a file"]);
    }

    #[test]
    fn used_sort_reverses_when_direction_toggled() {
        let mut items = vec![
            item(ItemContent::text("two"), 0, 2),
            item(ItemContent::text("five"), 0, 5),
            item(ItemContent::text("zero"), 0, 0),
        ];
        let mut view = ViewState::default();
        view.select_sort(SortKey::Used);
        sort_items(&mut items, view.sort_key, view.sort_ascending, |_| 0);
        let descending = contents(&items);
        assert_eq!(descending, vec!["five", "two", "zero"]);

        view.toggle_direction();
        sort_items(&mut items, view.sort_key, view.sort_ascending, |_| 0);
        let mut reversed = descending.clone();
        reversed.reverse();
        assert_eq!(contents(&items), reversed);
    }

    #[test]
    fn drop_index_scans_midpoints() {
        let rows = vec![(0, 30.0), (2, 90.0), (3, 150.0)];
        assert_eq!(drop_index(10.0, &rows, 5), 0);
        assert_eq!(drop_index(60.0, &rows, 5), 2);
        assert_eq!(drop_index(149.9, &rows, 5), 3);
        assert_eq!(drop_index(500.0, &rows, 5), 5);
        assert_eq!(drop_index(0.0, &[], 0), 0);
    }

    #[test]
    fn missing_file_has_zero_size() {
        let missing = item(ItemContent::file("/definitely/not/here.bin"), 0, 0);
        assert_eq!(file_size_on_disk(&missing), 0);
        let text = item(ItemContent::text("x"), 0, 0);
        assert_eq!(file_size_on_disk(&text), 0);
    }
}
