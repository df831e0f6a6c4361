//! 应用设置
//!
//! `settings.json` 的读写与校验。读取时缺失字段取默认值，文件损坏时回退为默认设置；
//! 写入走与快照相同的原子替换。

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::hotkey::HotkeyChord;
use crate::shelf::persist::{self, Loaded};
use crate::shelf::MAX_HISTORY;

pub const DEFAULT_HOTKEY: &str = "ctrl+shift+x";
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// 窗口位置与尺寸（仅保存，由前端使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor_clipboard: bool,
    pub hotkey: String,
    pub theme: String,
    pub close_to_tray: bool,
    pub max_history: usize,
    pub window_geometry: Option<WindowGeometry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor_clipboard: true,
            hotkey: DEFAULT_HOTKEY.to_string(),
            theme: "dark".to_string(),
            close_to_tray: false,
            max_history: DEFAULT_MAX_HISTORY,
            window_geometry: None,
        }
    }
}

impl Settings {
    /// 读取设置；文件缺失或损坏时回退为默认值
    pub fn load(path: &Path) -> Loaded<Self> {
        let loaded = match persist::read_json::<Self>(path) {
            Ok(Some(settings)) => Loaded { value: settings, diagnostic: None },
            Ok(None) => Loaded { value: Self::default(), diagnostic: None },
            Err(e) => {
                log::warn!("解析设置文件失败，使用默认设置: {e}");
                Loaded {
                    value: Self::default(),
                    diagnostic: Some(format!("解析设置文件失败: {e}")),
                }
            }
        };
        Loaded {
            value: loaded.value.sanitized(),
            diagnostic: loaded.diagnostic,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        persist::write_json_atomic(path, self, false)
    }

    /// 修正越界字段：历史容量截断到上限，非法快捷键恢复默认
    pub fn sanitized(mut self) -> Self {
        self.max_history = self.max_history.min(MAX_HISTORY);
        if HotkeyChord::parse(&self.hotkey).is_err() {
            log::warn!("设置中的快捷键无效，恢复默认: {}", self.hotkey);
            self.hotkey = DEFAULT_HOTKEY.to_string();
        }
        self
    }

    /// 应用一份新的设置
    ///
    /// 快捷键校验失败时保留旧值（其余字段照常更新），返回值指示快捷键是否被拒绝。
    pub fn apply(&mut self, mut incoming: Settings) -> bool {
        let hotkey_rejected = match HotkeyChord::parse(&incoming.hotkey) {
            Ok(chord) => {
                incoming.hotkey = chord.to_string();
                false
            }
            Err(e) => {
                log::info!("拒绝无效快捷键，保留 {}: {e}", self.hotkey);
                incoming.hotkey = self.hotkey.clone();
                true
            }
        };
        incoming.max_history = incoming.max_history.min(MAX_HISTORY);
        *self = incoming;
        hotkey_rejected
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
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

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme": "light"}"#).unwrap();
        assert_eq!(settings.theme, "light");
        assert!(settings.monitor_clipboard);
        assert_eq!(settings.hotkey, DEFAULT_HOTKEY);
        assert_eq!(settings.max_history, DEFAULT_MAX_HISTORY);
        assert!(settings.window_geometry.is_none());
    }

    #[test]
    fn load_clamps_and_repairs() {
        let dir = unique_temp_dir("settings_clamp");
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"max_history": 99999, "hotkey": "x"}"#).unwrap();
        let loaded = Settings::load(&path);
        assert!(loaded.diagnostic.is_none());
        assert_eq!(loaded.value.max_history, MAX_HISTORY);
        assert_eq!(loaded.value.hotkey, DEFAULT_HOTKEY);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_loads_defaults_with_diagnostic() {
        let dir = unique_temp_dir("settings_corrupt");
        let path = dir.join("settings.json");
        fs::write(&path, "not json").unwrap();
        let loaded = Settings::load(&path);
        assert_eq!(loaded.value, Settings::default());
        assert!(loaded.diagnostic.is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = unique_temp_dir("settings_save");
        let path = dir.join("settings.json");
        let settings = Settings {
            close_to_tray: true,
            window_geometry: Some(WindowGeometry { x: 10, y: 20, width: 300, height: 500 }),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).value, settings);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn apply_keeps_previous_hotkey_when_invalid() {
        let mut settings = Settings::default();
        let incoming = Settings {
            hotkey: "shift".to_string(),
            theme: "light".to_string(),
            ..Settings::default()
        };
        assert!(settings.apply(incoming));
        assert_eq!(settings.hotkey, DEFAULT_HOTKEY);
        assert_eq!(settings.theme, "light");

        let incoming = Settings { hotkey: "Alt+Space".to_string(), ..settings.clone() };
        assert!(!settings.apply(incoming));
        assert_eq!(settings.hotkey, "alt+space");
    }
}
