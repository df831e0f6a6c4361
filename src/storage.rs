//! 数据目录管理模块
//!
//! # 设计思路
//!
//! 统一管理条目快照、历史快照、设置文件与单实例端口文件的存放位置，
//! 支持通过环境变量覆盖数据目录，并在目录不存在时自动创建。
//!
//! # 实现思路
//!
//! - 优先使用 `DROPSHELF_DATA_DIR` 指定的目录。
//! - 未设置时回退到系统数据目录（`dirs::data_dir()`）下的 `DropShelf` 子目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;

/// 覆盖数据目录的环境变量
pub const DATA_DIR_ENV: &str = "DROPSHELF_DATA_DIR";

const APP_DIR_NAME: &str = "DropShelf";
const ITEMS_FILE: &str = "shelf_items.json";
const HISTORY_FILE: &str = "shelf_history.json";
const SETTINGS_FILE: &str = "settings.json";
const INSTANCE_FILE: &str = "instance.port";

/// 应用所有持久化文件的路径集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPaths {
    pub root: PathBuf,
    pub items: PathBuf,
    pub history: PathBuf,
    pub settings: PathBuf,
    pub instance: PathBuf,
}

impl DataPaths {
    /// 以给定目录为根构造路径集合（不触碰文件系统）
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            items: root.join(ITEMS_FILE),
            history: root.join(HISTORY_FILE),
            settings: root.join(SETTINGS_FILE),
            instance: root.join(INSTANCE_FILE),
            root,
        }
    }

    /// 解析数据目录并确保其存在
    ///
    /// # 返回
    /// - `Ok(DataPaths)`：可用的数据目录
    /// - `Err(AppError::Storage)`：无法获取或创建目录
    pub fn resolve() -> Result<Self, AppError> {
        let custom = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty());
        let root = match custom {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| AppError::Storage("获取系统数据目录失败".to_string()))?
                .join(APP_DIR_NAME),
        };
        ensure_dir(&root)?;
        Ok(Self::in_dir(root))
    }
}

/// 确保目录存在
pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Storage(format!("创建数据目录 '{}' 失败: {}", dir.display(), e))
        })?;
    }
    Ok(())
}
