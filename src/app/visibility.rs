//! 货架可见性状态
//!
//! 该模块记录货架窗口的关键运行态（可见 / 最小化），并给出快捷键切换、
//! 单实例唤起与关闭请求对应的动作。前端负责把动作落到真实窗口上。
//!
//! # 设计思路
//!
//! - 将“状态判定”从窗口操作中抽离，形成可独立测试的状态机。
//! - 使用简单值对象承载状态，避免上层直接依赖平台窗口细节。
//!
//! # 切换规则
//!
//! | 当前状态 | 快捷键 | `SHOW` 信号 |
//! |----------|--------|-------------|
//! | 隐藏 | 显示 | 显示 |
//! | 可见且最小化 | 还原 | 还原 |
//! | 可见 | 隐藏 | 保持（聚焦） |

use serde::Serialize;

/// 窗口可见性状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShelfWindow {
    /// 窗口当前是否可见
    pub is_visible: bool,
    /// 窗口当前是否最小化
    pub is_minimized: bool,
}

/// 需要前端执行的窗口动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    Show,
    Restore,
    Focus,
    Hide,
    Quit,
}

impl ShelfWindow {
    /// 快捷键切换
    pub fn toggle(&mut self) -> WindowAction {
        let action = match (self.is_visible, self.is_minimized) {
            (false, _) => WindowAction::Show,
            (true, true) => WindowAction::Restore,
            (true, false) => WindowAction::Hide,
        };
        self.apply(action);
        action
    }

    /// 第二个实例发来的 `SHOW`：总是让窗口出现在前台
    pub fn show(&mut self) -> WindowAction {
        let action = match (self.is_visible, self.is_minimized) {
            (false, _) => WindowAction::Show,
            (true, true) => WindowAction::Restore,
            (true, false) => WindowAction::Focus,
        };
        self.apply(action);
        action
    }

    /// 关闭请求：`close_to_tray` 时隐藏到托盘，否则退出
    pub fn close_requested(&mut self, close_to_tray: bool) -> WindowAction {
        let action = if close_to_tray {
            WindowAction::Hide
        } else {
            WindowAction::Quit
        };
        self.apply(action);
        action
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.is_minimized = minimized && self.is_visible;
    }

    fn apply(&mut self, action: WindowAction) {
        match action {
            WindowAction::Show | WindowAction::Restore | WindowAction::Focus => {
                self.is_visible = true;
                self.is_minimized = false;
            }
            WindowAction::Hide | WindowAction::Quit => {
                self.is_visible = false;
                self.is_minimized = false;
            }
        }
    }
}
