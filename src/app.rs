//! 应用层
//!
//! | 子模块 | 职责 |
//! |--------|------|
//! | [`context`] | `AppContext`：持有仓库 / 历史 / 视图 / 设置，修改后持久化 |
//! | [`event`] | `AppEvent` 队列与分发，处理器边界捕获错误与 panic |
//! | [`visibility`] | 货架窗口可见性状态机 |

pub mod context;
pub mod event;
pub mod visibility;

pub use context::{AppContext, ClipboardWriter, SystemClipboard};
pub use event::{dispatch, run, AppEvent, DropPayload, Flow, ShelfCommand};
pub use visibility::{ShelfWindow, WindowAction};
