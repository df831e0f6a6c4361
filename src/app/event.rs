//! 事件队列与分发
//!
//! # 设计思路
//!
//! 剪贴板监听线程、快捷键转发线程、单实例监听线程与标题抓取任务都只做一件事：
//! 把 [`AppEvent`] 投递到 `mpsc` 队列。事件循环线程逐个取出事件，
//! 以 `&mut AppContext` 同步处理，事件之间天然互斥，不会在操作中途交错。
//!
//! # 实现思路
//!
//! - 每个事件的处理包在 `catch_unwind` 中，panic 只记录日志，事件循环继续运行。
//! - 输入校验失败静默丢弃（调试日志），其余错误转为非阻塞提示。
//! - 关闭请求按 `close_to_tray` 决定隐藏还是退出；`Shutdown` 或队列关闭时退出循环。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::clipboard::ClipboardPayload;
use crate::error::AppError;
use crate::settings::{Settings, WindowGeometry};
use crate::shelf::{HistoryEntry, ItemContent, SortKey, Tab, TypeFilter};

use super::context::AppContext;
use super::visibility::WindowAction;

/// 投递到事件循环的事件
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// 剪贴板内容变化（已节流、已分类）
    ClipboardChanged(ClipboardPayload),
    /// 全局快捷键按下
    HotkeyPressed,
    /// 第二个实例发来 `SHOW`
    ShowRequested,
    Dropped(DropPayload),
    /// 后台标题抓取完成
    TitleResolved { url: String, title: String },
    /// 前端发起的操作
    Command(ShelfCommand),
    Shutdown,
}

/// 拖放内容
#[derive(Debug, Clone)]
pub enum DropPayload {
    /// 从外部拖入
    External(ClipboardPayload),
    /// 列表内拖拽重排；`rows` 为可见行的 `(仓库下标, 行中线纵坐标)`
    Reorder {
        content: ItemContent,
        drop_y: f64,
        rows: Vec<(usize, f64)>,
    },
}

/// 前端操作
#[derive(Debug, Clone)]
pub enum ShelfCommand {
    Delete(ItemContent),
    DeleteSelected,
    ToggleFavorite(ItemContent),
    ClearAll { confirmed: bool },
    Undo,
    SetTags(ItemContent, Vec<String>),
    AddTag(ItemContent, String),
    RemoveTag(ItemContent, String),
    EditContent(ItemContent, String),
    Open(ItemContent),
    Copy(ItemContent),
    Reveal(ItemContent),
    Promote(HistoryEntry),
    SelectTab(Tab),
    SetTypeFilter(TypeFilter),
    SetQuery(String),
    SortBy(SortKey),
    ToggleSortDirection,
    ToggleSelected(ItemContent),
    SelectAllVisible,
    ClearSelection,
    Import(PathBuf),
    Export(PathBuf),
    UpdateSettings(Settings),
    SaveGeometry(WindowGeometry),
    SetMinimized(bool),
    CloseRequested,
}

/// 处理完一个事件后循环是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl AppEvent {
    /// 日志用的简短名称
    pub fn label(&self) -> &'static str {
        match self {
            AppEvent::ClipboardChanged(_) => "clipboard_changed",
            AppEvent::HotkeyPressed => "hotkey_pressed",
            AppEvent::ShowRequested => "show_requested",
            AppEvent::Dropped(_) => "dropped",
            AppEvent::TitleResolved { .. } => "title_resolved",
            AppEvent::Command(_) => "command",
            AppEvent::Shutdown => "shutdown",
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知 panic".to_string()
    }
}

/// 在边界内执行处理器；panic 时记录日志并返回 `None`
fn run_guarded<T>(label: &str, handler: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(value) => Some(value),
        Err(payload) => {
            log::error!("处理事件 {label} 时发生 panic: {}", panic_message(payload.as_ref()));
            None
        }
    }
}

/// 处理单个事件
pub fn dispatch(ctx: &mut AppContext, event: AppEvent) -> Flow {
    let label = event.label();
    log::trace!("处理事件: {event:?}");
    match run_guarded(label, || handle(ctx, event)) {
        Some(Ok(flow)) => flow,
        Some(Err(AppError::InvalidInput(reason))) => {
            log::debug!("事件 {label} 输入无效，已忽略: {reason}");
            Flow::Continue
        }
        Some(Err(e)) => {
            log::warn!("事件 {label} 处理失败: {e}");
            ctx.notify(e.to_string());
            Flow::Continue
        }
        None => Flow::Continue,
    }
}

fn window_flow(action: WindowAction) -> Flow {
    log::debug!("窗口动作: {action:?}");
    if action == WindowAction::Quit {
        Flow::Quit
    } else {
        Flow::Continue
    }
}

fn handle(ctx: &mut AppContext, event: AppEvent) -> Result<Flow, AppError> {
    match event {
        AppEvent::ClipboardChanged(payload) => {
            ctx.capture(payload);
        }
        AppEvent::HotkeyPressed => return Ok(window_flow(ctx.toggle_window())),
        AppEvent::ShowRequested => return Ok(window_flow(ctx.show_window())),
        AppEvent::Dropped(DropPayload::External(payload)) => {
            ctx.drop_external(payload);
        }
        AppEvent::Dropped(DropPayload::Reorder { content, drop_y, rows }) => {
            ctx.reorder(&content, drop_y, &rows)?;
        }
        AppEvent::TitleResolved { url, title } => {
            ctx.apply_title(&url, &title);
        }
        AppEvent::Command(command) => return handle_command(ctx, command),
        AppEvent::Shutdown => {
            log::info!("收到退出事件");
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}

fn handle_command(ctx: &mut AppContext, command: ShelfCommand) -> Result<Flow, AppError> {
    match command {
        ShelfCommand::Delete(content) => {
            ctx.delete(&content)?;
        }
        ShelfCommand::DeleteSelected => {
            ctx.delete_selected()?;
        }
        ShelfCommand::ToggleFavorite(content) => {
            ctx.toggle_favorite(&content)?;
        }
        ShelfCommand::ClearAll { confirmed } => {
            ctx.clear_all(confirmed);
        }
        ShelfCommand::Undo => {
            ctx.undo();
        }
        ShelfCommand::SetTags(content, tags) => ctx.set_tags(&content, tags)?,
        ShelfCommand::AddTag(content, tag) => {
            ctx.add_tag(&content, &tag)?;
        }
        ShelfCommand::RemoveTag(content, tag) => {
            ctx.remove_tag(&content, &tag)?;
        }
        ShelfCommand::EditContent(content, text) => {
            ctx.edit_content(&content, &text)?;
        }
        ShelfCommand::Open(content) => ctx.open(&content)?,
        ShelfCommand::Copy(content) => ctx.copy(&content)?,
        ShelfCommand::Reveal(content) => ctx.reveal(&content)?,
        ShelfCommand::Promote(entry) => {
            ctx.promote(&entry)?;
        }
        ShelfCommand::SelectTab(tab) => ctx.select_tab(tab),
        ShelfCommand::SetTypeFilter(filter) => ctx.set_type_filter(filter),
        ShelfCommand::SetQuery(query) => ctx.set_query(&query),
        ShelfCommand::SortBy(key) => ctx.sort_by(key),
        ShelfCommand::ToggleSortDirection => ctx.toggle_sort_direction(),
        ShelfCommand::ToggleSelected(content) => {
            ctx.toggle_selected(&content)?;
        }
        ShelfCommand::SelectAllVisible => ctx.select_all_visible(),
        ShelfCommand::ClearSelection => ctx.clear_selection(),
        ShelfCommand::Import(path) => {
            ctx.import(&path)?;
        }
        ShelfCommand::Export(path) => ctx.export(&path)?,
        ShelfCommand::UpdateSettings(settings) => ctx.update_settings(settings),
        ShelfCommand::SaveGeometry(geometry) => ctx.save_geometry(geometry),
        ShelfCommand::SetMinimized(minimized) => ctx.set_minimized(minimized),
        ShelfCommand::CloseRequested => return Ok(window_flow(ctx.close_requested())),
    }
    Ok(Flow::Continue)
}

/// 事件循环：直到收到退出事件或所有发送端关闭
pub fn run(ctx: &mut AppContext, events: Receiver<AppEvent>) {
    log::info!("事件循环已启动");
    while let Ok(event) = events.recv() {
        if dispatch(ctx, event) == Flow::Quit {
            break;
        }
    }
    log::info!("事件循环已退出");
}
