//! # DropShelf 剪贴板货架：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │   事件源（各自独立线程，只负责投递 AppEvent）             │
//! │                                                          │
//! │  clipboard::listener ── hotkey 转发 ── instance 监听     │
//! │            title 抓取任务 ── 前端命令 / 拖放              │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ std::sync::mpsc (AppEvent)
//! ┌───────┴──────────────────────────────────────────────────┐
//! │   事件循环线程（唯一修改者）                              │
//! │                                                          │
//! │  app::event::dispatch ── catch_unwind + 错误转提示        │
//! │       ↓ &mut AppContext                                  │
//! │  ┌─ shelf::store ── 条目仓库（去重合并 / 删除策略 / 撤销） │
//! │  ├─ shelf::view ─── 标签页 · 类型过滤 · 搜索 · 排序        │
//! │  ├─ shelf::history  剪贴板历史环形缓冲                    │
//! │  └─ shelf::persist  原子快照写入 + 滚动备份               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`shelf`] | 条目模型、仓库、视图引擎、历史日志、快照与持久化 |
//! | [`settings`] | `settings.json` 的默认值、容错读取、校验与原子保存 |
//! | [`storage`] | 数据目录解析（支持环境变量覆盖）与文件名 |
//! | [`hotkey`] | 快捷键解析校验、系统注册与事件转发 |
//! | [`instance`] | 单实例锁与 `SHOW` 信号 |
//! | [`clipboard`] | 剪贴板监听、内容分类、IgnoreGuard（RAII）写入 |
//! | [`launcher`] | 用系统默认程序打开条目 / 定位文件 |
//! | [`title`] | 链接标题后台抓取 |
//! | [`app`] | 应用上下文、事件队列、窗口可见性 |

pub mod app;
pub mod clipboard;
pub mod error;
pub mod hotkey;
pub mod instance;
pub mod launcher;
pub mod settings;
pub mod shelf;
pub mod storage;
pub mod title;
