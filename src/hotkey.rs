//! 全局快捷键
//!
//! # 设计思路
//!
//! 快捷键分两层：
//!
//! - [`HotkeyChord`]：纯数据的组合键描述，负责解析与校验（至少一个修饰键加一个主键），
//!   不依赖任何系统资源，可在设置校验时直接使用。
//! - [`HotkeyBinding`]：持有 `GlobalHotKeyManager`，负责向系统注册 / 改绑，
//!   并由转发线程把按下事件投递到事件队列。
//!
//! # 实现思路
//!
//! - 组合键规范化为小写、固定修饰键顺序的字符串（如 `ctrl+shift+x`），作为设置中的存储形式。
//! - 主键到扫描码的映射交给 `global_hotkey::hotkey::HotKey` 的 `FromStr`。
//! - 改绑失败时恢复旧绑定，保证任何时刻至多一个有效快捷键。

use std::fmt;
use std::str::FromStr;
use std::thread;

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use crate::error::AppError;

/// 组合键描述
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HotkeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub key: String,
}

impl HotkeyChord {
    /// 解析并校验组合键字符串
    ///
    /// 接受 `+` 分隔、大小写不敏感的写法，如 `Ctrl+Shift+X`、`alt + space`。
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let mut chord = Self::default();
        for part in input.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(AppError::InvalidInput(format!("快捷键格式错误: {input}")));
            }
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "meta" | "super" | "cmd" | "command" | "win" => chord.meta = true,
                key => {
                    if !chord.key.is_empty() {
                        return Err(AppError::InvalidInput(format!(
                            "快捷键只能包含一个主键: {input}"
                        )));
                    }
                    chord.key = key.to_string();
                }
            }
        }

        if !chord.has_modifier() {
            return Err(AppError::InvalidInput(format!("快捷键至少需要一个修饰键: {input}")));
        }
        if chord.key.is_empty() {
            return Err(AppError::InvalidInput(format!("快捷键缺少主键: {input}")));
        }
        chord.to_hotkey()?;
        Ok(chord)
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }

    /// 转换为系统快捷键描述
    pub fn to_hotkey(&self) -> Result<HotKey, AppError> {
        HotKey::from_str(&self.to_string())
            .map_err(|e| AppError::InvalidInput(format!("无法识别的按键 '{}': {e}", self.key)))
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = [
            (self.ctrl, "ctrl"),
            (self.alt, "alt"),
            (self.shift, "shift"),
            (self.meta, "super"),
        ];
        for (enabled, name) in modifiers {
            if enabled {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

/// 已向系统注册的快捷键
pub struct HotkeyBinding {
    manager: GlobalHotKeyManager,
    current: HotKey,
    chord: HotkeyChord,
}

impl HotkeyBinding {
    /// 创建管理器并注册快捷键
    pub fn register(chord: HotkeyChord) -> Result<Self, AppError> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| AppError::Hotkey(format!("初始化快捷键管理器失败: {e}")))?;
        let current = chord.to_hotkey()?;
        manager
            .register(current)
            .map_err(|e| AppError::Hotkey(format!("注册快捷键 {chord} 失败: {e}")))?;
        log::info!("全局快捷键已注册: {chord}");
        Ok(Self { manager, current, chord })
    }

    /// 改绑快捷键；新键注册失败时恢复旧键并返回错误
    pub fn rebind(&mut self, chord: HotkeyChord) -> Result<(), AppError> {
        if chord == self.chord {
            return Ok(());
        }
        let next = chord.to_hotkey()?;
        if let Err(e) = self.manager.unregister(self.current) {
            log::warn!("注销旧快捷键 {} 失败: {e}", self.chord);
        }
        if let Err(e) = self.manager.register(next) {
            if let Err(restore_err) = self.manager.register(self.current) {
                log::error!("恢复旧快捷键 {} 失败: {restore_err}", self.chord);
            }
            return Err(AppError::Hotkey(format!("注册快捷键 {chord} 失败: {e}")));
        }
        log::info!("全局快捷键已改绑: {} -> {chord}", self.chord);
        self.current = next;
        self.chord = chord;
        Ok(())
    }
}

impl Drop for HotkeyBinding {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unregister(self.current) {
            log::warn!("退出前清理全局快捷键失败: {e}");
        }
    }
}

/// 启动转发线程：每次快捷键按下时调用 `on_press`
///
/// 回调返回 `false`（通常是事件队列已关闭）时线程退出。
/// 改绑后 id 会变化，因此这里只过滤按下状态，不按 id 过滤。
pub fn spawn_forwarder<F>(on_press: F) -> thread::JoinHandle<()>
where
    F: Fn() -> bool + Send + 'static,
{
    thread::spawn(move || {
        let rx = GlobalHotKeyEvent::receiver();
        while let Ok(event) = rx.recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            if !on_press() {
                log::debug!("事件队列已关闭，快捷键转发线程退出");
                break;
            }
        }
    })
}
