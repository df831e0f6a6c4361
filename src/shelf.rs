//! 货架核心：条目仓库、视图引擎、历史日志与快照持久化
//!
//! ## 子模块
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`item`] | 条目类型与数据模型 |
//! | [`store`] | 条目仓库：添加合并、分级删除、收藏、撤销、标签、重排 |
//! | [`view`] | 标签页 / 类型 / 搜索过滤与排序，纯函数 |
//! | [`history`] | 固定容量的剪贴板历史环形缓冲区 |
//! | [`snapshot`] | JSON 快照记录格式 |
//! | [`persist`] | 原子写入、滚动备份、容错读取、导入导出 |
//!
//! 本模块的所有类型都不是线程安全的，只能由持有 `AppContext` 的事件循环线程修改。

pub mod history;
pub mod item;
pub mod persist;
pub mod snapshot;
pub mod store;
pub mod view;

pub use history::{HistoryEntry, HistoryLog, MAX_HISTORY};
pub use item::{Item, ItemContent, ItemKind, NewItem};
pub use store::{AddOutcome, DeleteOutcome, ItemStore};
pub use view::{SortKey, Tab, TypeFilter, ViewState};
