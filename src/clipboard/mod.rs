//! 剪贴板模块
//!
//! # 设计思路
//!
//! 统一管理货架与系统剪贴板之间的交互：
//! - **监控**：通过 `clipboard-master` 监听系统剪贴板变化，节流后读取内容并回调
//! - **忽略标志 + RAII Guard**：货架自身写入剪贴板（复制条目）时不应被再次捕获，
//!   写入前构造 `IgnoreGuard`，监控器消费标志后跳过该次变化
//! - **分类**：把剪贴板 / 拖放的原始内容归类为文件、链接或文本
//! - **读写**：基于 `arboard` 读取文本、写回文本
//!
//! # 实现思路
//!
//! - 忽略标志使用 `AtomicBool` + `SeqCst` 实现无锁跨线程安全。
//! - 监控开关同样是原子标志，设置变更时即时生效，无需重启监听线程。
//! - 子模块按职责拆分：分类归 `classify`，监听归 `listener`，读写归 `io`。

pub mod classify;
pub mod io;
pub mod listener;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;

pub use classify::{classify_clipboard_text, classify_drop_text};
pub use io::{read_payload, write_text};
pub use listener::start_monitoring;

/// 一次剪贴板变化 / 拖放携带的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    /// 本地文件列表（绝对路径）
    Files(Vec<PathBuf>),
    /// 链接
    Url(String),
    /// 普通文本（已去除首尾空白）
    Text(String),
}

// ============================================================================
// 剪贴板忽略标志
// ============================================================================

/// 全局标志：忽略下一次剪贴板变化事件
static IGNORE_NEXT_CLIPBOARD_CHANGE: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(false));

/// 全局开关：是否捕获剪贴板变化（对应设置 `monitor_clipboard`）
static MONITOR_ENABLED: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(true));

/// 设置忽略下一次剪贴板变化事件的标志
///
/// **推荐使用 `IgnoreGuard::new()` 替代直接调用**。
pub fn set_ignore_flag() {
    IGNORE_NEXT_CLIPBOARD_CHANGE.store(true, Ordering::SeqCst);
    log::debug!("🚫 已设置剪贴板忽略标志 - 下一次剪贴板变化将被忽略");
}

/// 消费忽略标志；返回调用前标志是否已设置
pub(crate) fn take_ignore_flag() -> bool {
    IGNORE_NEXT_CLIPBOARD_CHANGE.swap(false, Ordering::SeqCst)
}

pub fn set_monitoring_enabled(enabled: bool) {
    let previous = MONITOR_ENABLED.swap(enabled, Ordering::SeqCst);
    if previous != enabled {
        log::info!("📋 剪贴板捕获已{}", if enabled { "开启" } else { "暂停" });
    }
}

pub fn is_monitoring_enabled() -> bool {
    MONITOR_ENABLED.load(Ordering::SeqCst)
}

// ============================================================================
// IgnoreGuard：RAII 忽略标志管理
// ============================================================================

/// 剪贴板忽略标志的 RAII 守卫
///
/// 构造时设置忽略标志；若写入失败（剪贴板未变化），`Drop` 时由调用方决定是否撤销。
///
/// # 示例
/// ```rust,no_run
/// use drop_shelf::clipboard;
///
/// fn copy_back(text: &str) {
///     let guard = clipboard::IgnoreGuard::new();
///     // ... 写入剪贴板 ...
///     guard.commit();
/// }
/// ```
pub struct IgnoreGuard {
    committed: bool,
}

impl IgnoreGuard {
    /// 创建守卫并立即设置忽略标志
    pub fn new() -> Self {
        set_ignore_flag();
        Self { committed: false }
    }

    /// 写入成功，标志留给监控器消费
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Default for IgnoreGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IgnoreGuard {
    fn drop(&mut self) {
        // 写入失败时剪贴板不会变化，残留的标志会吞掉下一次真实的外部复制
        if !self.committed {
            IGNORE_NEXT_CLIPBOARD_CHANGE.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 两个标志是进程级全局状态，放在同一个测试里串行验证
    #[test]
    fn ignore_guard_and_monitor_switch() {
        {
            let guard = IgnoreGuard::new();
            guard.commit();
        }
        assert!(take_ignore_flag());
        assert!(!take_ignore_flag());

        {
            let _guard = IgnoreGuard::new();
        }
        assert!(!take_ignore_flag());

        set_monitoring_enabled(false);
        assert!(!is_monitoring_enabled());
        set_monitoring_enabled(true);
        assert!(is_monitoring_enabled());
    }
}
