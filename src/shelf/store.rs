//! 条目仓库
//!
//! ## 设计思路
//!
//! 仓库持有唯一一份有序条目序列（最新在前），收藏 / 全部两个视图都由标记位派生，
//! 不存在第二份存储。所有修改都经由本模块完成，以维护两条不变量：
//!
//! - 同一 `(kind, content)` 在仓库中至多出现一次，重复添加走合并。
//! - `hidden_from_main` 为真时 `is_favorite` 必为真。
//!
//! ## 实现思路
//!
//! - 删除按当前标签页分两级保护：收藏页的删除只降级，全部页删除收藏只隐藏，
//!   只有全部页删除普通条目才会真正移除，并把完整快照压入撤销栈。
//! - 批量操作先在副本上计算完整的新状态，再一次性替换，失败时原状态不受影响。
//! - 撤销栈按批次记录被移除条目及其原始下标，深度上限 [`UNDO_DEPTH`]。

use std::collections::VecDeque;

use super::item::{normalize_tags, Item, ItemContent, NewItem};
use super::view::{self, SortKey, Tab};
use crate::error::AppError;

/// 撤销栈保留的最大批次数
pub const UNDO_DEPTH: usize = 50;

/// 一次 `add` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// 条目在序列中的位置（总是 0）
    pub index: usize,
    /// 是否与已有条目合并
    pub merged: bool,
    /// 是否需要刷新可见列表；已隐藏的收藏新增时无需刷新，但仍需持久化
    pub needs_refresh: bool,
    /// 合并后条目是否为收藏
    pub is_favorite: bool,
}

/// 单条删除按标签页策略得到的实际效果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 收藏页删除：取消收藏，回到全部列表
    Demoted,
    /// 全部页删除收藏：仅从全部列表隐藏
    HiddenFromMain,
    /// 全部页删除普通条目：永久移除（可撤销）
    Removed,
}

#[derive(Debug, Clone)]
struct RemovedItem {
    index: usize,
    item: Item,
}

/// 条目仓库
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<Item>,
    undo: VecDeque<Vec<RemovedItem>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按快照顺序（最新在前）重建仓库
    ///
    /// 逆序逐条 `add`，使最终顺序与快照一致；重复记录按合并规则处理，
    /// 空内容记录被跳过并记录日志。
    pub fn from_snapshot(records: Vec<NewItem>) -> Self {
        let mut store = Self::new();
        store.extend_from_snapshot(records);
        store
    }

    /// 把一组快照记录经由 `add` 并入仓库（导入 / 加载共用）
    ///
    /// 返回实际并入的记录数。
    pub fn extend_from_snapshot(&mut self, records: Vec<NewItem>) -> usize {
        let mut accepted = 0;
        for record in records.into_iter().rev() {
            let label = record.content.to_string();
            match self.add(record) {
                Ok(_) => accepted += 1,
                Err(e) => log::warn!("跳过无效快照记录 {label}: {e}"),
            }
        }
        accepted
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, content: &ItemContent) -> Option<usize> {
        self.items.iter().position(|item| &item.content == content)
    }

    pub fn get(&self, content: &ItemContent) -> Option<&Item> {
        self.items.iter().find(|item| &item.content == content)
    }

    fn require(&self, content: &ItemContent) -> Result<usize, AppError> {
        self.position(content)
            .ok_or_else(|| AppError::ItemNotFound(content.to_string()))
    }

    /// 添加条目；`(kind, content)` 已存在时合并到最前
    ///
    /// 合并规则：收藏标记取或、`hidden_from_main` 清零、`use_count` 取较大值、
    /// 标签取并集（已有在前）、保留已抓取的标题、`date_added` 更新为本次捕获时间。
    pub fn add(&mut self, new: NewItem) -> Result<AddOutcome, AppError> {
        if new.content.is_blank() {
            return Err(AppError::InvalidInput("条目内容为空".to_string()));
        }

        let incoming = Item::from_new(new);
        let (item, merged) = match self.position(&incoming.content) {
            Some(index) => {
                let existing = self.items.remove(index);
                (merge(existing, incoming), true)
            }
            None => (incoming, false),
        };

        let outcome = AddOutcome {
            index: 0,
            merged,
            needs_refresh: !(item.is_favorite && item.hidden_from_main),
            is_favorite: item.is_favorite,
        };
        self.items.insert(0, item);
        Ok(outcome)
    }

    /// 按标签页策略删除单个条目
    pub fn delete(&mut self, content: &ItemContent, tab: Tab) -> Result<DeleteOutcome, AppError> {
        let index = self.require(content)?;
        let (outcome, removed) = apply_delete(&mut self.items, index, tab)?;
        if let Some(removed) = removed {
            self.push_undo(vec![removed]);
        }
        Ok(outcome)
    }

    /// 批量删除：对每个条目应用标签页策略，永久移除的条目记为一个撤销批次
    ///
    /// 任一条目不存在则整体失败，仓库保持原状。
    pub fn bulk_delete(
        &mut self,
        contents: &[ItemContent],
        tab: Tab,
    ) -> Result<Vec<DeleteOutcome>, AppError> {
        if tab == Tab::History {
            return Err(AppError::InvalidInput("历史标签页不支持删除".to_string()));
        }

        let mut indices = Vec::with_capacity(contents.len());
        for content in contents {
            let index = self.require(content)?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        let mut next = self.items.clone();
        let mut outcomes = Vec::with_capacity(indices.len());
        let mut batch = Vec::new();
        // 从后往前删，前面的下标保持有效
        let mut ordered = indices.clone();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        for index in ordered {
            let (outcome, removed) = apply_delete(&mut next, index, tab)?;
            outcomes.push(outcome);
            if let Some(removed) = removed {
                batch.push(removed);
            }
        }

        self.items = next;
        for item in &mut self.items {
            item.selected = false;
        }
        if !batch.is_empty() {
            batch.sort_by_key(|removed| removed.index);
            self.push_undo(batch);
        }
        Ok(outcomes)
    }

    /// 切换收藏；取消收藏时同时清除隐藏标记。返回新的收藏状态
    pub fn toggle_favorite(&mut self, content: &ItemContent) -> Result<bool, AppError> {
        let index = self.require(content)?;
        let item = &mut self.items[index];
        item.is_favorite = !item.is_favorite;
        if !item.is_favorite {
            item.hidden_from_main = false;
        }
        Ok(item.is_favorite)
    }

    /// 清空：普通条目永久移除（记为一个撤销批次），收藏条目仅从全部列表隐藏
    ///
    /// 返回被移除的条目数。
    pub fn clear_all(&mut self) -> usize {
        let mut kept = Vec::with_capacity(self.items.len());
        let mut batch = Vec::new();
        for (index, mut item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            item.selected = false;
            if item.is_favorite {
                item.hidden_from_main = true;
                kept.push(item);
            } else {
                batch.push(RemovedItem { index, item });
            }
        }
        self.items = kept;

        let removed = batch.len();
        if removed > 0 {
            self.push_undo(batch);
        }
        removed
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// 撤销最近一批永久删除，返回恢复的条目内容
    ///
    /// 条目按原始下标插回；期间被重新添加过的条目经由 `add` 合并。
    pub fn undo(&mut self) -> Vec<ItemContent> {
        let Some(batch) = self.undo.pop_back() else {
            return Vec::new();
        };

        let mut restored = Vec::with_capacity(batch.len());
        for RemovedItem { index, item } in batch {
            let content = item.content.clone();
            if self.position(&content).is_some() {
                if let Err(e) = self.add(NewItem::from(&item)) {
                    log::warn!("撤销合并失败 {content}: {e}");
                    continue;
                }
            } else {
                let at = index.min(self.items.len());
                self.items.insert(at, item);
            }
            restored.push(content);
        }
        restored
    }

    fn push_undo(&mut self, batch: Vec<RemovedItem>) {
        self.undo.push_back(batch);
        while self.undo.len() > UNDO_DEPTH {
            self.undo.pop_front();
        }
    }

    /// 替换条目的全部标签
    pub fn set_tags<I, S>(&mut self, content: &ItemContent, tags: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = self.require(content)?;
        self.items[index].tags = normalize_tags(tags);
        Ok(())
    }

    /// 追加标签；返回是否实际新增
    pub fn add_tag(&mut self, content: &ItemContent, tag: &str) -> Result<bool, AppError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::InvalidInput("标签不能为空".to_string()));
        }
        let index = self.require(content)?;
        let tags = &mut self.items[index].tags;
        if tags.iter().any(|existing| existing == tag) {
            return Ok(false);
        }
        tags.push(tag.to_string());
        Ok(true)
    }

    /// 移除标签；返回是否实际移除
    pub fn remove_tag(&mut self, content: &ItemContent, tag: &str) -> Result<bool, AppError> {
        let index = self.require(content)?;
        let tags = &mut self.items[index].tags;
        let before = tags.len();
        tags.retain(|existing| existing != tag.trim());
        Ok(tags.len() != before)
    }

    /// 编辑文本 / 链接条目的内容，类型保持不变
    ///
    /// 返回编辑后的新身份。
    pub fn edit_content(
        &mut self,
        content: &ItemContent,
        new_text: &str,
    ) -> Result<ItemContent, AppError> {
        let index = self.require(content)?;
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(AppError::InvalidInput("条目内容为空".to_string()));
        }

        let edited = match content {
            ItemContent::Text(_) => ItemContent::text(new_text),
            ItemContent::Url(_) => ItemContent::url(new_text),
            ItemContent::File(_) => {
                return Err(AppError::InvalidInput("文件条目不支持编辑内容".to_string()));
            }
        };
        if &edited == content {
            return Ok(edited);
        }
        if self.position(&edited).is_some() {
            return Err(AppError::Duplicate(edited.to_string()));
        }

        let item = &mut self.items[index];
        item.content = edited.clone();
        // 标题属于旧链接
        item.title = None;
        Ok(edited)
    }

    /// 主操作（打开 / 复制）计数加一，返回新的计数
    pub fn record_use(&mut self, content: &ItemContent) -> Result<u64, AppError> {
        let index = self.require(content)?;
        let item = &mut self.items[index];
        item.use_count = item.use_count.saturating_add(1);
        Ok(item.use_count)
    }

    /// 写入后台抓取到的链接标题
    ///
    /// 仅当仍存在内容相同的链接条目时生效；条目已被删除或编辑时为无害的空操作。
    pub fn set_title(&mut self, url: &str, title: &str) -> bool {
        let key = ItemContent::url(url);
        let title = title.trim();
        match self.position(&key) {
            Some(index) if !title.is_empty() => {
                self.items[index].title = Some(title.to_string());
                true
            }
            _ => false,
        }
    }

    /// 拖拽重排：把 `from` 处的条目移到 `to` 之前
    ///
    /// `to` 取值 `0..=len`，`len` 表示移到末尾。
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), AppError> {
        let len = self.items.len();
        if from >= len || to > len {
            return Err(AppError::InvalidInput(format!(
                "重排下标越界: from={from}, to={to}, len={len}"
            )));
        }
        let target = if from < to { to - 1 } else { to };
        if target == from {
            return Ok(());
        }
        let item = self.items.remove(from);
        self.items.insert(target, item);
        Ok(())
    }

    /// 显式排序，直接重排存储顺序
    pub fn sort<F>(&mut self, key: SortKey, ascending: bool, size_of: F)
    where
        F: Fn(&Item) -> u64,
    {
        view::sort_items(&mut self.items, key, ascending, size_of);
    }

    /// 切换批量选择状态，返回新的选中状态
    pub fn toggle_selected(&mut self, content: &ItemContent) -> Result<bool, AppError> {
        let index = self.require(content)?;
        let item = &mut self.items[index];
        item.selected = !item.selected;
        Ok(item.selected)
    }

    /// 选中给定下标的条目（通常为当前可见条目）
    pub fn select_indices(&mut self, indices: &[usize]) {
        for &index in indices {
            if let Some(item) = self.items.get_mut(index) {
                item.selected = true;
            }
        }
    }

    pub fn clear_selection(&mut self) {
        for item in &mut self.items {
            item.selected = false;
        }
    }

    pub fn selected_contents(&self) -> Vec<ItemContent> {
        self.items
            .iter()
            .filter(|item| item.selected)
            .map(|item| item.content.clone())
            .collect()
    }

    /// 校验仓库不变量，返回首个违规描述
    pub fn check_invariants(&self) -> Result<(), String> {
        for (index, item) in self.items.iter().enumerate() {
            if item.hidden_from_main && !item.is_favorite {
                return Err(format!("条目 {index} 隐藏但未收藏: {}", item.content));
            }
            if self.items[..index].iter().any(|other| other.content == item.content) {
                return Err(format!("条目 {index} 重复: {}", item.content));
            }
        }
        Ok(())
    }
}

fn merge(existing: Item, incoming: Item) -> Item {
    let mut tags = existing.tags;
    for tag in incoming.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Item {
        content: existing.content,
        is_favorite: existing.is_favorite || incoming.is_favorite,
        hidden_from_main: false,
        tags,
        date_added: incoming.date_added,
        use_count: existing.use_count.max(incoming.use_count),
        title: existing.title.or(incoming.title),
        selected: false,
    }
}

fn apply_delete(
    items: &mut Vec<Item>,
    index: usize,
    tab: Tab,
) -> Result<(DeleteOutcome, Option<RemovedItem>), AppError> {
    match tab {
        Tab::History => Err(AppError::InvalidInput("历史标签页不支持删除".to_string())),
        Tab::Favorites => {
            let item = &mut items[index];
            item.is_favorite = false;
            item.hidden_from_main = false;
            item.selected = false;
            Ok((DeleteOutcome::Demoted, None))
        }
        Tab::All if items[index].is_favorite => {
            let item = &mut items[index];
            item.hidden_from_main = true;
            item.selected = false;
            Ok((DeleteOutcome::HiddenFromMain, None))
        }
        Tab::All => {
            let mut item = items.remove(index);
            item.selected = false;
            Ok((DeleteOutcome::Removed, Some(RemovedItem { index, item })))
        }
    }
}
