//! 打开条目
//!
//! # 设计思路
//!
//! 条目的主操作之一是“打开”：链接交给默认浏览器，文件交给默认程序；
//! 文件条目另有“打开所在位置”。统一通过平台自带的打开命令实现，不引入 GUI 依赖。
//!
//! # 实现思路
//!
//! - Windows 用 `explorer`（定位文件用 `/select,`），macOS 用 `open`（定位用 `-R`），
//!   其余平台用 `xdg-open` 打开父目录。
//! - 命令行先由纯函数构造，再 `spawn`，构造部分可单独测试。
//! - 目标文件已不存在时直接返回 `AppError::Launch`，不启动外部进程。

use std::path::Path;
use std::process::Command;

use crate::error::AppError;
use crate::shelf::ItemContent;

/// 待执行的打开命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl OpenCommand {
    fn spawn(&self) -> Result<(), AppError> {
        Command::new(self.program)
            .args(&self.args)
            .spawn()
            .map_err(|e| AppError::Launch(format!("启动 {} 失败: {}", self.program, e)))?;
        Ok(())
    }
}

/// 链接补全协议：`www.` 开头的链接按 https 打开
pub fn normalize_url(url: &str) -> String {
    if url.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("www.")) {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}

/// 构造“用默认程序打开”的命令
pub fn open_command(target: &str) -> OpenCommand {
    if cfg!(target_os = "windows") {
        OpenCommand { program: "explorer", args: vec![target.to_string()] }
    } else if cfg!(target_os = "macos") {
        OpenCommand { program: "open", args: vec![target.to_string()] }
    } else {
        OpenCommand { program: "xdg-open", args: vec![target.to_string()] }
    }
}

/// 构造“打开文件所在位置”的命令
pub fn reveal_command(path: &Path) -> OpenCommand {
    let display = path.to_string_lossy().to_string();
    if cfg!(target_os = "windows") {
        OpenCommand { program: "explorer", args: vec!["/select,".to_string(), display] }
    } else if cfg!(target_os = "macos") {
        OpenCommand { program: "open", args: vec!["-R".to_string(), display] }
    } else {
        let parent = path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or(display);
        OpenCommand { program: "xdg-open", args: vec![parent] }
    }
}

fn require_existing(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        Ok(())
    } else {
        Err(AppError::Launch(format!("文件不存在: {}", path.display())))
    }
}

/// 打开条目：链接用浏览器，文件用默认程序；文本条目不支持打开
pub fn open_item(content: &ItemContent) -> Result<(), AppError> {
    let command = match content {
        ItemContent::Url(url) => open_command(&normalize_url(url)),
        ItemContent::File(path) => {
            require_existing(path)?;
            open_command(&path.to_string_lossy())
        }
        ItemContent::Text(_) => {
            return Err(AppError::InvalidInput("文本条目没有可打开的目标".to_string()));
        }
    };
    log::debug!("打开条目: {content}");
    command.spawn()
}

/// 在文件管理器中定位文件条目
pub fn reveal_item(content: &ItemContent) -> Result<(), AppError> {
    let path = content
        .file_path()
        .ok_or_else(|| AppError::InvalidInput("只有文件条目可以打开所在位置".to_string()))?;
    require_existing(path)?;
    reveal_command(path).spawn()
}
