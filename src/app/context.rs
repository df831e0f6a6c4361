//! 应用上下文
//!
//! # 设计思路
//!
//! `AppContext` 是唯一持有条目仓库、历史日志、视图参数与设置的对象，
//! 只在事件循环线程上被修改，事件处理器以 `&mut AppContext` 访问，不存在全局单例。
//!
//! - 每次修改后立即持久化；持久化失败只记录日志并生成提示，不向调用方传播。
//! - 外部资源失败（文件缺失、剪贴板被占用、快捷键冲突）返回错误，
//!   由事件分发层转为非阻塞提示，应用继续运行。
//! - `paths` 为 `None` 时是纯内存上下文，测试与无数据目录的场景共用同一套逻辑。
//!
//! # 实现思路
//!
//! - 剪贴板写入经由 [`ClipboardWriter`] 注入，生产环境为 [`SystemClipboard`]。
//! - 标题抓取器、快捷键绑定均为可选组件，缺失时对应功能静默跳过。
//! - `view_revision` 在可见列表需要重绘时递增，前端据此决定是否刷新。

use std::path::Path;

use crate::clipboard::{self, ClipboardPayload};
use crate::error::AppError;
use crate::hotkey::{HotkeyBinding, HotkeyChord};
use crate::launcher;
use crate::settings::{Settings, WindowGeometry};
use crate::shelf::persist;
use crate::shelf::view::{self, file_size_on_disk};
use crate::shelf::{
    AddOutcome, DeleteOutcome, HistoryEntry, HistoryLog, Item, ItemContent, ItemStore, NewItem,
    SortKey, Tab, TypeFilter, ViewState,
};
use crate::storage::DataPaths;
use crate::title::TitleFetcher;

use super::visibility::{ShelfWindow, WindowAction};

/// 剪贴板写入端
pub trait ClipboardWriter {
    fn write_text(&self, text: &str) -> Result<(), AppError>;
}

/// 系统剪贴板（arboard）
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), AppError> {
        clipboard::write_text(text)
    }
}

/// 应用上下文
pub struct AppContext {
    store: ItemStore,
    history: HistoryLog,
    view: ViewState,
    settings: Settings,
    paths: Option<DataPaths>,
    window: ShelfWindow,
    titles: Option<TitleFetcher>,
    hotkey: Option<HotkeyBinding>,
    clipboard: Box<dyn ClipboardWriter>,
    notices: Vec<String>,
    view_revision: u64,
}

impl AppContext {
    /// 创建不落盘的上下文
    pub fn in_memory(settings: Settings) -> Self {
        let settings = settings.sanitized();
        Self {
            store: ItemStore::new(),
            history: HistoryLog::new(settings.max_history),
            view: ViewState::default(),
            settings,
            paths: None,
            window: ShelfWindow::default(),
            titles: None,
            hotkey: None,
            clipboard: Box::new(SystemClipboard),
            notices: Vec::new(),
            view_revision: 0,
        }
    }

    /// 从数据目录加载设置、条目与历史；任何文件损坏都回退为空并生成提示
    pub fn load(paths: DataPaths) -> Self {
        let settings = Settings::load(&paths.settings);
        let items = persist::load_items(&paths.items);
        let history = persist::load_history(&paths.history);

        let mut ctx = Self::in_memory(settings.value);
        ctx.store = ItemStore::from_snapshot(items.value);
        ctx.history = HistoryLog::from_entries(ctx.settings.max_history, history.value);
        ctx.paths = Some(paths);

        for diagnostic in [settings.diagnostic, items.diagnostic, history.diagnostic]
            .into_iter()
            .flatten()
        {
            ctx.notify(diagnostic);
        }
        log::info!(
            "货架已加载: {} 个条目, {} 条历史",
            ctx.store.len(),
            ctx.history.len()
        );
        ctx
    }

    pub fn with_title_fetcher(mut self, fetcher: TitleFetcher) -> Self {
        self.titles = Some(fetcher);
        self
    }

    pub fn with_hotkey(mut self, binding: HotkeyBinding) -> Self {
        self.hotkey = Some(binding);
        self
    }

    pub fn with_clipboard(mut self, writer: impl ClipboardWriter + 'static) -> Self {
        self.clipboard = Box::new(writer);
        self
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> Option<&DataPaths> {
        self.paths.as_ref()
    }

    pub fn window(&self) -> ShelfWindow {
        self.window
    }

    pub fn view_revision(&self) -> u64 {
        self.view_revision
    }

    /// 记录一条面向用户的非阻塞提示
    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("提示: {message}");
        self.notices.push(message);
    }

    /// 取走积压的提示
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn refresh(&mut self) {
        self.view_revision = self.view_revision.wrapping_add(1);
    }

    // ------------------------------------------------------------------
    // 持久化
    // ------------------------------------------------------------------

    fn persist_items(&mut self) {
        let Some(paths) = &self.paths else { return };
        if let Err(e) = persist::save_items(&paths.items, &self.store) {
            log::error!("保存条目快照失败: {e}");
            self.notify(format!("保存条目失败: {e}"));
        }
    }

    fn persist_history(&mut self) {
        let Some(paths) = &self.paths else { return };
        if let Err(e) = persist::save_history(&paths.history, &self.history) {
            log::error!("保存历史快照失败: {e}");
        }
    }

    fn persist_settings(&mut self) {
        let Some(paths) = &self.paths else { return };
        if let Err(e) = self.settings.save(&paths.settings) {
            log::error!("保存设置失败: {e}");
            self.notify(format!("保存设置失败: {e}"));
        }
    }

    // ------------------------------------------------------------------
    // 捕获与添加
    // ------------------------------------------------------------------

    /// 处理一次剪贴板变化：写入历史并把内容加入货架
    ///
    /// 返回加入（或合并）的条目数；捕获关闭时返回 0。
    pub fn capture(&mut self, payload: ClipboardPayload) -> usize {
        if !self.settings.monitor_clipboard {
            log::debug!("剪贴板捕获已关闭，忽略变化");
            return 0;
        }

        let mut recorded = false;
        let mut added = 0;
        for content in payload.into_contents() {
            recorded |= self.history.record(content.clone());
            match self.add_item(NewItem::new(content)) {
                Ok(_) => added += 1,
                Err(e) => log::warn!("捕获条目失败: {e}"),
            }
        }
        if recorded {
            self.persist_history();
            if self.view.tab == Tab::History {
                self.refresh();
            }
        }
        added
    }

    /// 外部拖入：加入货架，不写历史
    pub fn drop_external(&mut self, payload: ClipboardPayload) -> usize {
        let mut added = 0;
        for content in payload.into_contents() {
            match self.add_item(NewItem::new(content)) {
                Ok(_) => added += 1,
                Err(e) => log::warn!("拖入条目失败: {e}"),
            }
        }
        added
    }

    /// 添加条目（重复时合并），随后持久化并按需刷新
    pub fn add_item(&mut self, new: NewItem) -> Result<AddOutcome, AppError> {
        let content = new.content.clone();
        let outcome = self.store.add(new)?;

        // 按合并后的收藏标记判断
        if self.view.tab == Tab::Favorites && !outcome.is_favorite {
            log::debug!("新增非收藏条目，切换到全部标签页");
            self.view.tab = Tab::All;
        }
        if outcome.needs_refresh {
            self.refresh();
        }
        self.persist_items();

        if let ItemContent::Url(url) = &content {
            let untitled = self.store.get(&content).is_some_and(|item| item.title().is_none());
            if let (true, Some(titles)) = (untitled, self.titles.as_mut()) {
                titles.request(url);
            }
        }
        Ok(outcome)
    }

    /// 把历史记录提升为货架条目
    pub fn promote(&mut self, entry: &HistoryEntry) -> Result<AddOutcome, AppError> {
        self.add_item(NewItem::new(entry.content.clone()))
    }

    // ------------------------------------------------------------------
    // 删除与撤销
    // ------------------------------------------------------------------

    pub fn delete(&mut self, content: &ItemContent) -> Result<DeleteOutcome, AppError> {
        let outcome = self.store.delete(content, self.view.tab)?;
        if outcome == DeleteOutcome::Removed {
            self.cancel_title(content);
        }
        self.refresh();
        self.persist_items();
        Ok(outcome)
    }

    /// 删除所有已选条目；返回处理的条目数
    pub fn delete_selected(&mut self) -> Result<usize, AppError> {
        let selected = self.store.selected_contents();
        if selected.is_empty() {
            return Ok(0);
        }
        let outcomes = self.store.bulk_delete(&selected, self.view.tab)?;
        for content in &selected {
            if self.store.position(content).is_none() {
                self.cancel_title(content);
            }
        }
        self.refresh();
        self.persist_items();
        Ok(outcomes.len())
    }

    /// 清空货架；未确认时不做任何事
    pub fn clear_all(&mut self, confirmed: bool) -> usize {
        if !confirmed {
            log::debug!("清空未确认，跳过");
            return 0;
        }
        let before: Vec<ItemContent> = self
            .store
            .items()
            .iter()
            .map(|item| item.content().clone())
            .collect();
        let removed = self.store.clear_all();
        for content in &before {
            if self.store.position(content).is_none() {
                self.cancel_title(content);
            }
        }
        log::info!("已清空货架，移除 {removed} 个条目");
        self.refresh();
        self.persist_items();
        removed
    }

    /// 撤销最近一批删除，返回恢复的条目数
    pub fn undo(&mut self) -> usize {
        let restored = self.store.undo();
        if restored.is_empty() {
            return 0;
        }
        self.refresh();
        self.persist_items();
        restored.len()
    }

    fn cancel_title(&mut self, content: &ItemContent) {
        if let (ItemContent::Url(url), Some(titles)) = (content, self.titles.as_mut()) {
            titles.cancel(url);
        }
    }

    // ------------------------------------------------------------------
    // 条目编辑
    // ------------------------------------------------------------------

    pub fn toggle_favorite(&mut self, content: &ItemContent) -> Result<bool, AppError> {
        let favorite = self.store.toggle_favorite(content)?;
        self.refresh();
        self.persist_items();
        Ok(favorite)
    }

    pub fn set_tags(&mut self, content: &ItemContent, tags: Vec<String>) -> Result<(), AppError> {
        self.store.set_tags(content, tags)?;
        self.refresh();
        self.persist_items();
        Ok(())
    }

    pub fn add_tag(&mut self, content: &ItemContent, tag: &str) -> Result<bool, AppError> {
        let added = self.store.add_tag(content, tag)?;
        if added {
            self.refresh();
            self.persist_items();
        }
        Ok(added)
    }

    pub fn remove_tag(&mut self, content: &ItemContent, tag: &str) -> Result<bool, AppError> {
        let removed = self.store.remove_tag(content, tag)?;
        if removed {
            self.refresh();
            self.persist_items();
        }
        Ok(removed)
    }

    /// 编辑文本 / 链接内容；链接变更后重新抓取标题
    pub fn edit_content(
        &mut self,
        content: &ItemContent,
        new_text: &str,
    ) -> Result<ItemContent, AppError> {
        let edited = self.store.edit_content(content, new_text)?;
        if &edited != content {
            self.cancel_title(content);
            if let (ItemContent::Url(url), Some(titles)) = (&edited, self.titles.as_mut()) {
                titles.request(url);
            }
            self.refresh();
            self.persist_items();
        }
        Ok(edited)
    }

    /// 后台标题抓取结果；条目已不存在时为空操作
    pub fn apply_title(&mut self, url: &str, title: &str) -> bool {
        if let Some(titles) = self.titles.as_mut() {
            titles.complete(url);
        }
        let applied = self.store.set_title(url, title);
        if applied {
            self.refresh();
            self.persist_items();
        } else {
            log::debug!("丢弃过期的标题结果: {url}");
        }
        applied
    }

    // ------------------------------------------------------------------
    // 主操作
    // ------------------------------------------------------------------

    /// 打开条目并计数
    pub fn open(&mut self, content: &ItemContent) -> Result<(), AppError> {
        if self.store.position(content).is_none() {
            return Err(AppError::ItemNotFound(content.to_string()));
        }
        launcher::open_item(content)?;
        self.record_use(content)
    }

    /// 复制条目到剪贴板并计数；文件条目复制其路径
    pub fn copy(&mut self, content: &ItemContent) -> Result<(), AppError> {
        if self.store.position(content).is_none() {
            return Err(AppError::ItemNotFound(content.to_string()));
        }
        self.clipboard.write_text(&content.as_str())?;
        self.record_use(content)
    }

    pub fn reveal(&self, content: &ItemContent) -> Result<(), AppError> {
        launcher::reveal_item(content)
    }

    fn record_use(&mut self, content: &ItemContent) -> Result<(), AppError> {
        let count = self.store.record_use(content)?;
        log::debug!("条目使用次数 {count}: {content}");
        if self.view.sort_key == SortKey::Used {
            self.refresh();
        }
        self.persist_items();
        Ok(())
    }

    // ------------------------------------------------------------------
    // 视图
    // ------------------------------------------------------------------

    pub fn select_tab(&mut self, tab: Tab) {
        if self.view.tab != tab {
            self.view.tab = tab;
            self.store.clear_selection();
            self.refresh();
        }
    }

    pub fn set_type_filter(&mut self, filter: TypeFilter) {
        self.view.type_filter = filter;
        self.refresh();
    }

    pub fn set_query(&mut self, query: &str) {
        self.view.query = query.to_string();
        self.refresh();
    }

    /// 选择排序键（方向重置为默认）并重排存储顺序
    pub fn sort_by(&mut self, key: SortKey) {
        self.view.select_sort(key);
        self.apply_sort();
    }

    pub fn toggle_sort_direction(&mut self) {
        self.view.toggle_direction();
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        self.store
            .sort(self.view.sort_key, self.view.sort_ascending, file_size_on_disk);
        self.refresh();
        self.persist_items();
    }

    /// 拖拽重排：`rows` 为可见行的 `(仓库下标, 行中线纵坐标)`
    pub fn reorder(
        &mut self,
        content: &ItemContent,
        drop_y: f64,
        rows: &[(usize, f64)],
    ) -> Result<(), AppError> {
        let from = self
            .store
            .position(content)
            .ok_or_else(|| AppError::ItemNotFound(content.to_string()))?;
        let to = view::drop_index(drop_y, rows, self.store.len());
        self.store.move_item(from, to)?;
        self.refresh();
        self.persist_items();
        Ok(())
    }

    /// 当前标签页的可见条目；历史标签页返回空，见 [`Self::visible_history`]
    pub fn visible_items(&self) -> Vec<&Item> {
        if self.view.tab == Tab::History {
            return Vec::new();
        }
        view::visible(self.store.items(), &self.view)
    }

    pub fn visible_history(&self) -> Vec<&HistoryEntry> {
        self.history.visible(self.view.type_filter, &self.view.query)
    }

    /// 可见列表为空时的提示语
    pub fn empty_hint(&self) -> Option<&'static str> {
        let empty = match self.view.tab {
            Tab::History => self.visible_history().is_empty(),
            Tab::All | Tab::Favorites => self.visible_items().is_empty(),
        };
        empty.then(|| self.view.tab.empty_hint())
    }

    // ------------------------------------------------------------------
    // 批量选择
    // ------------------------------------------------------------------

    pub fn toggle_selected(&mut self, content: &ItemContent) -> Result<bool, AppError> {
        let selected = self.store.toggle_selected(content)?;
        self.refresh();
        Ok(selected)
    }

    pub fn select_all_visible(&mut self) {
        if self.view.tab == Tab::History {
            return;
        }
        let indices = view::visible_indices(self.store.items(), &self.view);
        self.store.select_indices(&indices);
        self.refresh();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
        self.refresh();
    }

    // ------------------------------------------------------------------
    // 导入导出
    // ------------------------------------------------------------------

    /// 导入条目快照，返回并入的条目数
    pub fn import(&mut self, path: &Path) -> Result<usize, AppError> {
        let records = persist::import_items(path)?;
        let accepted = self.store.extend_from_snapshot(records);
        log::info!("已从 {} 导入 {accepted} 个条目", path.display());
        self.refresh();
        self.persist_items();
        Ok(accepted)
    }

    pub fn export(&self, path: &Path) -> Result<(), AppError> {
        persist::export_items(path, &self.store)?;
        log::info!("已导出 {} 个条目到 {}", self.store.len(), path.display());
        Ok(())
    }

    // ------------------------------------------------------------------
    // 设置与窗口
    // ------------------------------------------------------------------

    /// 应用新设置：快捷键非法或注册失败时保留旧快捷键，历史容量即时生效
    pub fn update_settings(&mut self, incoming: Settings) {
        let previous_hotkey = self.settings.hotkey.clone();
        let previous_monitor = self.settings.monitor_clipboard;
        if self.settings.apply(incoming) {
            self.notify("快捷键需要至少一个修饰键和一个主键，已保留原设置");
        }

        if self.settings.hotkey != previous_hotkey {
            let rebound = match self.hotkey.as_mut() {
                Some(binding) => HotkeyChord::parse(&self.settings.hotkey)
                    .and_then(|chord| binding.rebind(chord)),
                None => Ok(()),
            };
            if let Err(e) = rebound {
                self.settings.hotkey = previous_hotkey;
                self.notify(format!("快捷键注册失败，已保留原设置: {e}"));
            }
        }

        let evicted = self.history.resize(self.settings.max_history);
        if evicted > 0 {
            log::info!("历史容量调整为 {}，淘汰 {evicted} 条", self.settings.max_history);
            self.persist_history();
        }

        if self.settings.monitor_clipboard != previous_monitor {
            clipboard::set_monitoring_enabled(self.settings.monitor_clipboard);
        }
        self.refresh();
        self.persist_settings();
    }

    pub fn save_geometry(&mut self, geometry: WindowGeometry) {
        self.settings.window_geometry = Some(geometry);
        self.persist_settings();
    }

    pub fn toggle_window(&mut self) -> WindowAction {
        let action = self.window.toggle();
        log::debug!("快捷键切换窗口: {action:?}");
        action
    }

    pub fn show_window(&mut self) -> WindowAction {
        self.window.show()
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.window.set_minimized(minimized);
    }

    pub fn close_requested(&mut self) -> WindowAction {
        self.window.close_requested(self.settings.close_to_tray)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_temp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("drop_shelf_{prefix}_{nanos}"));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[derive(Clone, Default)]
    struct RecordingClipboard(Rc<RefCell<Vec<String>>>);

    impl ClipboardWriter for RecordingClipboard {
        fn write_text(&self, text: &str) -> Result<(), AppError> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl ClipboardWriter for BrokenClipboard {
        fn write_text(&self, _text: &str) -> Result<(), AppError> {
            Err(AppError::Clipboard("busy".to_string()))
        }
    }

    fn ctx() -> AppContext {
        AppContext::in_memory(Settings::default()).with_clipboard(RecordingClipboard::default())
    }

    #[test]
    fn capture_adds_item_and_history() {
        let mut ctx = ctx();
        assert_eq!(ctx.capture(ClipboardPayload::Text("hello".into())), 1);
        assert_eq!(ctx.store().len(), 1);
        assert_eq!(ctx.history().len(), 1);
    }

    #[test]
    fn capture_is_skipped_when_monitoring_disabled() {
        let mut ctx = AppContext::in_memory(Settings {
            monitor_clipboard: false,
            ..Settings::default()
        });
        assert_eq!(ctx.capture(ClipboardPayload::Text("hello".into())), 0);
        assert!(ctx.store().is_empty());
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn drop_does_not_write_history() {
        let mut ctx = ctx();
        ctx.drop_external(ClipboardPayload::Url("https://a.b".into()));
        assert_eq!(ctx.store().len(), 1);
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn non_favorite_add_leaves_favorites_tab() {
        let mut ctx = ctx();
        ctx.select_tab(Tab::Favorites);
        ctx.add_item(NewItem::new(ItemContent::text("a")).favorite(true)).unwrap();
        assert_eq!(ctx.view().tab, Tab::Favorites);

        ctx.add_item(NewItem::new(ItemContent::text("b"))).unwrap();
        assert_eq!(ctx.view().tab, Tab::All);
    }

    #[test]
    fn hidden_favorite_add_skips_refresh() {
        let mut ctx = ctx();
        let before = ctx.view_revision();
        ctx.add_item(
            NewItem::new(ItemContent::text("a"))
                .favorite(true)
                .hidden_from_main(true),
        )
        .unwrap();
        assert_eq!(ctx.view_revision(), before);
        assert_eq!(ctx.store().len(), 1);
    }

    #[test]
    fn hidden_favorite_add_is_persisted() {
        let dir = unique_temp_dir("context_hidden_favorite");
        let paths = DataPaths::in_dir(&dir);
        let mut ctx = AppContext::load(paths.clone());
        let before = ctx.view_revision();
        ctx.add_item(
            NewItem::new(ItemContent::text("secret"))
                .favorite(true)
                .hidden_from_main(true),
        )
        .unwrap();
        assert_eq!(ctx.view_revision(), before);

        let saved = persist::load_items(&paths.items).value;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].content, ItemContent::text("secret"));
        assert!(saved[0].is_favorite && saved[0].hidden_from_main);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_of_favorite_keeps_favorites_tab() {
        let mut ctx = ctx();
        ctx.add_item(NewItem::new(ItemContent::text("a")).favorite(true)).unwrap();
        ctx.select_tab(Tab::Favorites);

        // 合并后仍是收藏，不切换标签页
        let outcome = ctx.add_item(NewItem::new(ItemContent::text("a"))).unwrap();
        assert!(outcome.is_favorite);
        assert_eq!(ctx.view().tab, Tab::Favorites);
    }

    #[test]
    fn copy_writes_clipboard_and_counts_use() {
        let clipboard = RecordingClipboard::default();
        let mut ctx = AppContext::in_memory(Settings::default()).with_clipboard(clipboard.clone());
        let file = ItemContent::file("/tmp/report.pdf");
        ctx.add_item(NewItem::new(file.clone())).unwrap();

        ctx.copy(&file).unwrap();
        assert_eq!(*clipboard.0.borrow(), vec!["/tmp/report.pdf".to_string()]);
        assert_eq!(ctx.store().get(&file).unwrap().use_count(), 1);
    }

    #[test]
    fn failed_copy_does_not_count_use() {
        let mut ctx = AppContext::in_memory(Settings::default()).with_clipboard(BrokenClipboard);
        let text = ItemContent::text("a");
        ctx.add_item(NewItem::new(text.clone())).unwrap();
        assert!(matches!(ctx.copy(&text), Err(AppError::Clipboard(_))));
        assert_eq!(ctx.store().get(&text).unwrap().use_count(), 0);
    }

    #[test]
    fn opening_missing_file_is_reported_and_not_counted() {
        let mut ctx = ctx();
        let missing = ItemContent::file("/definitely/not/here.txt");
        ctx.add_item(NewItem::new(missing.clone())).unwrap();
        assert!(matches!(ctx.open(&missing), Err(AppError::Launch(_))));
        assert_eq!(ctx.store().get(&missing).unwrap().use_count(), 0);
    }

    #[test]
    fn clear_all_requires_confirmation_and_can_be_undone() {
        let mut ctx = ctx();
        ctx.add_item(NewItem::new(ItemContent::text("a"))).unwrap();
        ctx.add_item(NewItem::new(ItemContent::text("b")).favorite(true)).unwrap();

        assert_eq!(ctx.clear_all(false), 0);
        assert_eq!(ctx.visible_items().len(), 2);

        assert_eq!(ctx.clear_all(true), 1);
        assert!(ctx.visible_items().is_empty());
        assert_eq!(ctx.empty_hint(), Some(Tab::All.empty_hint()));

        assert_eq!(ctx.undo(), 1);
        assert_eq!(ctx.visible_items().len(), 1);
    }

    #[test]
    fn delete_selected_uses_tab_policy() {
        let mut ctx = ctx();
        let plain = ItemContent::text("plain");
        let fav = ItemContent::text("fav");
        ctx.add_item(NewItem::new(plain.clone())).unwrap();
        ctx.add_item(NewItem::new(fav.clone()).favorite(true)).unwrap();
        ctx.select_all_visible();

        assert_eq!(ctx.delete_selected().unwrap(), 2);
        assert!(ctx.store().get(&plain).is_none());
        assert!(ctx.store().get(&fav).unwrap().hidden_from_main());
        assert!(ctx.store().selected_contents().is_empty());
    }

    #[test]
    fn stale_title_is_discarded() {
        let mut ctx = ctx();
        let url = ItemContent::url("https://a.b");
        ctx.add_item(NewItem::new(url.clone())).unwrap();
        assert!(ctx.apply_title("https://a.b", "A"));
        assert_eq!(ctx.store().get(&url).unwrap().title(), Some("A"));

        ctx.delete(&url).unwrap();
        assert!(!ctx.apply_title("https://a.b", "A"));
    }

    #[test]
    fn invalid_hotkey_update_keeps_previous_and_notifies() {
        let mut ctx = ctx();
        ctx.update_settings(Settings {
            hotkey: "x".to_string(),
            theme: "light".to_string(),
            ..Settings::default()
        });
        assert_eq!(ctx.settings().hotkey, crate::settings::DEFAULT_HOTKEY);
        assert_eq!(ctx.settings().theme, "light");
        assert_eq!(ctx.take_notices().len(), 1);
        assert!(ctx.take_notices().is_empty());
    }

    #[test]
    fn shrinking_history_to_zero_purges() {
        let mut ctx = ctx();
        ctx.capture(ClipboardPayload::Text("a".into()));
        ctx.capture(ClipboardPayload::Text("b".into()));
        ctx.update_settings(Settings {
            max_history: 0,
            ..Settings::default()
        });
        assert!(ctx.history().is_empty());
        ctx.capture(ClipboardPayload::Text("c".into()));
        assert!(ctx.history().is_empty());
        assert_eq!(ctx.store().len(), 3);
    }

    #[test]
    fn reorder_moves_item_to_drop_position() {
        let mut ctx = ctx();
        for text in ["c", "b", "a"] {
            ctx.add_item(NewItem::new(ItemContent::text(text))).unwrap();
        }
        // 显示顺序 a, b, c；每行高 10，中线 5 / 15 / 25
        let rows = [(0, 5.0), (1, 15.0), (2, 25.0)];
        ctx.reorder(&ItemContent::text("a"), 30.0, &rows).unwrap();
        let order: Vec<String> = ctx
            .store()
            .items()
            .iter()
            .map(|item| item.content().as_str().into_owned())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn history_tab_lists_entries_newest_first() {
        let mut ctx = ctx();
        ctx.capture(ClipboardPayload::Text("first".into()));
        ctx.capture(ClipboardPayload::Text("second".into()));
        ctx.select_tab(Tab::History);
        assert!(ctx.visible_items().is_empty());
        let history: Vec<String> = ctx
            .visible_history()
            .iter()
            .map(|entry| entry.content.as_str().into_owned())
            .collect();
        assert_eq!(history, vec!["second", "first"]);
        assert!(ctx.delete(&ItemContent::text("first")).is_err());
    }

    #[test]
    fn state_survives_reload_from_disk() {
        let dir = unique_temp_dir("context_reload");
        let paths = DataPaths::in_dir(&dir);
        {
            let mut ctx = AppContext::load(paths.clone());
            ctx.capture(ClipboardPayload::Text("kept".into()));
            ctx.add_item(NewItem::new(ItemContent::url("https://a.b")).favorite(true))
                .unwrap();
            ctx.save_geometry(WindowGeometry { x: 1, y: 2, width: 300, height: 400 });
        }

        let ctx = AppContext::load(paths);
        assert_eq!(ctx.store().len(), 2);
        assert_eq!(ctx.history().len(), 1);
        assert!(ctx.store().items()[0].is_favorite());
        assert_eq!(ctx.settings().window_geometry.map(|g| g.width), Some(300));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_snapshot_loads_empty_with_notice() {
        let dir = unique_temp_dir("context_corrupt");
        let paths = DataPaths::in_dir(&dir);
        fs::write(&paths.items, "{ not json").unwrap();

        let mut ctx = AppContext::load(paths);
        assert!(ctx.store().is_empty());
        assert_eq!(ctx.take_notices().len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
