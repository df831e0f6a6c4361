// 防止在 Windows 发布版本中显示额外的控制台窗口，不要删除！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! # DropShelf 剪贴板货架：应用入口
//!
//! 本文件仅负责初始化：日志、数据目录、单实例、事件源线程与事件循环。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::sync::mpsc;
use std::sync::Arc;

use drop_shelf::app::{self, AppContext, AppEvent};
use drop_shelf::clipboard;
use drop_shelf::error::AppError;
use drop_shelf::hotkey::{self, HotkeyBinding, HotkeyChord};
use drop_shelf::instance::{self, InstanceRole};
use drop_shelf::storage::DataPaths;
use drop_shelf::title::TitleFetcher;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("启动失败: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    log::info!("setup: begin");
    let paths = DataPaths::resolve()?;
    log::info!("setup: 数据目录 {}", paths.root.display());

    let server = match instance::acquire(&paths.instance)? {
        InstanceRole::Secondary => {
            log::info!("已唤起运行中的实例，当前进程退出");
            return Ok(());
        }
        InstanceRole::Primary(server) => server,
    };

    let (tx, rx) = mpsc::channel::<AppEvent>();

    let show_tx = tx.clone();
    let _instance_guard = server.spawn(move || show_tx.send(AppEvent::ShowRequested).is_ok());
    log::info!("setup: instance listener started");

    let mut ctx = AppContext::load(paths);
    clipboard::set_monitoring_enabled(ctx.settings().monitor_clipboard);

    let title_tx = tx.clone();
    match TitleFetcher::new(Arc::new(move |url: String, title: String| {
        title_tx.send(AppEvent::TitleResolved { url, title }).is_ok()
    })) {
        Ok(fetcher) => ctx = ctx.with_title_fetcher(fetcher),
        Err(err) => log::warn!("setup: 标题抓取不可用: {err}"),
    }

    match HotkeyChord::parse(&ctx.settings().hotkey).and_then(HotkeyBinding::register) {
        Ok(binding) => ctx = ctx.with_hotkey(binding),
        Err(err) => ctx.notify(format!("全局快捷键不可用: {err}")),
    }
    let hotkey_tx = tx.clone();
    hotkey::spawn_forwarder(move || hotkey_tx.send(AppEvent::HotkeyPressed).is_ok());
    log::info!("setup: hotkey stage done");

    let clipboard_tx = tx.clone();
    clipboard::start_monitoring(move || match clipboard::read_payload() {
        Ok(Some(payload)) => clipboard_tx.send(AppEvent::ClipboardChanged(payload)).is_ok(),
        Ok(None) => true,
        Err(err) => {
            log::warn!("读取剪贴板失败: {err}");
            true
        }
    });
    log::info!("setup: clipboard monitor stage done");
    drop(tx);

    ctx.show_window();
    log::info!("setup: complete");

    app::run(&mut ctx, rx);
    Ok(())
}
