//! 快照持久化
//!
//! ## 设计思路
//!
//! 持久化只是扁平的 JSON 快照，不是事务型存储。写入必须原子：
//! 任何失败都不能截断或损坏上一次成功写入的文件，只有临时文件处于风险中。
//!
//! ## 实现思路
//!
//! - 写入：序列化 → 写临时文件并 `sync_all` → （条目快照）把旧文件复制为滚动备份 → `rename` 替换。
//!   任一步骤失败时删除临时文件，原文件保持不变。
//! - 读取：文件不存在视为空；解析失败时尝试备份；备份也失败则退化为空，并返回诊断信息。
//! - 导入 / 导出：用户指定路径，格式与条目快照一致；导入解析失败直接报错，不做回退。

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::history::{HistoryEntry, HistoryLog};
use super::item::NewItem;
use super::snapshot::{HistoryRecord, ItemRecord};
use super::store::ItemStore;
use crate::error::AppError;

/// 容错读取的结果：值总是可用，`diagnostic` 描述发生过的回退
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub diagnostic: Option<String>,
}

impl<T> Loaded<T> {
    fn clean(value: T) -> Self {
        Self { value, diagnostic: None }
    }
}

/// 在文件名后追加后缀，得到同目录下的兄弟路径
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// 滚动备份路径
pub fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".bak")
}

fn temp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

/// 原子写入 JSON 快照
///
/// `keep_backup` 为真时，替换前把旧文件复制为唯一一份滚动备份。
pub fn write_json_atomic<T>(path: &Path, value: &T, keep_backup: bool) -> Result<(), AppError>
where
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = write_then_replace(path, &tmp, &data, keep_backup);
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            log::warn!("清理临时快照失败 {}: {e}", tmp.display());
        }
    }
    result
}

fn write_then_replace(
    path: &Path,
    tmp: &Path,
    data: &[u8],
    keep_backup: bool,
) -> Result<(), AppError> {
    let mut file = File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    if keep_backup && path.is_file() {
        let backup = backup_path(path);
        if let Err(e) = fs::copy(path, &backup) {
            // 备份失败不阻止写入，上一份备份仍然有效
            log::warn!("滚动备份失败 {}: {e}", backup.display());
        }
    }

    fs::rename(tmp, path)?;
    Ok(())
}

/// 严格读取 JSON 文件；文件不存在返回 `Ok(None)`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value = serde_json::from_str(&content)?;
    Ok(Some(value))
}

/// 容错读取：主文件失败时尝试备份，仍失败则退化为默认值
fn read_tolerant<T>(path: &Path, backup: Option<&Path>) -> Loaded<T>
where
    T: DeserializeOwned + Default,
{
    let primary_err = match read_json::<T>(path) {
        Ok(Some(value)) => return Loaded::clean(value),
        Ok(None) => return Loaded::clean(T::default()),
        Err(e) => e,
    };
    log::error!("快照读取失败 {}: {primary_err}", path.display());

    if let Some(backup) = backup {
        match read_json::<T>(backup) {
            Ok(Some(value)) => {
                log::warn!("已从备份恢复快照: {}", backup.display());
                return Loaded {
                    value,
                    diagnostic: Some(format!(
                        "{} 已损坏（{primary_err}），已从备份恢复",
                        path.display()
                    )),
                };
            }
            Ok(None) => {}
            Err(e) => log::error!("备份读取失败 {}: {e}", backup.display()),
        }
    }

    Loaded {
        value: T::default(),
        diagnostic: Some(format!("{} 无法读取（{primary_err}），已重置为空", path.display())),
    }
}

/// 读取条目快照，返回按快照顺序（最新在前）排列的记录
pub fn load_items(path: &Path) -> Loaded<Vec<NewItem>> {
    let backup = backup_path(path);
    let loaded = read_tolerant::<Vec<ItemRecord>>(path, Some(&backup));
    Loaded {
        value: loaded.value.into_iter().map(NewItem::from).collect(),
        diagnostic: loaded.diagnostic,
    }
}

/// 写入条目快照（保留一份滚动备份）
pub fn save_items(path: &Path, store: &ItemStore) -> Result<(), AppError> {
    let records: Vec<ItemRecord> = store.items().iter().map(ItemRecord::from).collect();
    write_json_atomic(path, &records, true)
}

/// 读取历史快照，返回存储顺序（最旧在前）的记录
pub fn load_history(path: &Path) -> Loaded<Vec<HistoryEntry>> {
    let loaded = read_tolerant::<Vec<HistoryRecord>>(path, None);
    Loaded {
        value: loaded.value.into_iter().map(HistoryEntry::from).collect(),
        diagnostic: loaded.diagnostic,
    }
}

/// 写入历史快照（不保留备份）
pub fn save_history(path: &Path, log: &HistoryLog) -> Result<(), AppError> {
    let records: Vec<HistoryRecord> = log.entries().map(HistoryRecord::from).collect();
    write_json_atomic(path, &records, false)
}

/// 从用户指定路径导入条目快照
pub fn import_items(path: &Path) -> Result<Vec<NewItem>, AppError> {
    let records = read_json::<Vec<ItemRecord>>(path)?
        .ok_or_else(|| AppError::Storage(format!("导入文件不存在: {}", path.display())))?;
    Ok(records.into_iter().map(NewItem::from).collect())
}

/// 把当前仓库原样导出到用户指定路径
pub fn export_items(path: &Path, store: &ItemStore) -> Result<(), AppError> {
    let records: Vec<ItemRecord> = store.items().iter().map(ItemRecord::from).collect();
    write_json_atomic(path, &records, false)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::shelf::item::ItemContent;

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("drop_shelf_{prefix}_{nanos}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn sample_store() -> ItemStore {
        let mut store = ItemStore::new();
        store.add(NewItem::new(ItemContent::text("older"))).unwrap();
        store
            .add(NewItem::new(ItemContent::url("https://x.dev")).favorite(true).tags(["a"]))
            .unwrap();
        store
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let dir = unique_temp_dir("save_load");
        let path = dir.join("items.json");
        let store = sample_store();
        save_items(&path, &store).unwrap();

        let loaded = load_items(&path);
        assert!(loaded.diagnostic.is_none());
        let reloaded = ItemStore::from_snapshot(loaded.value);
        assert_eq!(reloaded.items(), store.items());
        assert!(!temp_path(&path).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_loads_empty_without_diagnostic() {
        let dir = unique_temp_dir("missing");
        let loaded = load_items(&dir.join("nope.json"));
        assert!(loaded.value.is_empty());
        assert!(loaded.diagnostic.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_falls_back_to_backup() {
        let dir = unique_temp_dir("backup");
        let path = dir.join("items.json");
        let store = sample_store();
        save_items(&path, &store).unwrap();
        // 第二次写入把第一次的内容滚动为备份
        save_items(&path, &store).unwrap();
        assert!(backup_path(&path).exists());

        fs::write(&path, b"{ not json").unwrap();
        let loaded = load_items(&path);
        assert_eq!(loaded.value.len(), 2);
        assert!(loaded.diagnostic.unwrap().contains("备份"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_without_backup_degrades_to_empty() {
        let dir = unique_temp_dir("corrupt");
        let path = dir.join("history.json");
        fs::write(&path, b"[{\"type\": 1}]").unwrap();
        let loaded = load_history(&path);
        assert!(loaded.value.is_empty());
        assert!(loaded.diagnostic.is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = unique_temp_dir("failed_write");
        let path = dir.join("items.json");
        save_items(&path, &sample_store()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // 临时文件位置被目录占用，写入必然失败
        fs::create_dir_all(temp_path(&path)).unwrap();
        assert!(save_items(&path, &ItemStore::new()).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn history_round_trip_keeps_stored_order() {
        let dir = unique_temp_dir("history");
        let path = dir.join("history.json");
        let mut log = HistoryLog::new(10);
        log.record(ItemContent::text("first"));
        log.record(ItemContent::text("second"));
        save_history(&path, &log).unwrap();

        let loaded = load_history(&path);
        let rebuilt = HistoryLog::from_entries(10, loaded.value);
        assert_eq!(rebuilt, log);
        assert!(!backup_path(&path).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn import_missing_file_is_an_error() {
        let dir = unique_temp_dir("import_missing");
        assert!(matches!(
            import_items(&dir.join("missing.json")),
            Err(AppError::Storage(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_then_import_round_trips() {
        let dir = unique_temp_dir("export");
        let path = dir.join("export.json");
        let store = sample_store();
        export_items(&path, &store).unwrap();
        let imported = import_items(&path).unwrap();
        assert_eq!(ItemStore::from_snapshot(imported).items(), store.items());
        let _ = fs::remove_dir_all(&dir);
    }
}
