//! 剪贴板读写
//!
//! 基于 `arboard` 的文本读写。写入统一经过 [`IgnoreGuard`]，
//! 避免货架把自己复制出去的内容再次捕获。

use super::classify::classify_clipboard_text;
use super::{ClipboardPayload, IgnoreGuard};
use crate::error::AppError;

/// 读取当前剪贴板并分类
///
/// # 返回
/// - `Ok(Some(payload))`：剪贴板中有可捕获的内容
/// - `Ok(None)`：剪贴板为空或不含文本（例如图片）
/// - `Err(AppError::Clipboard)`：无法访问剪贴板
pub fn read_payload() -> Result<Option<ClipboardPayload>, AppError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| AppError::Clipboard(e.to_string()))?;

    match clipboard.get_text() {
        Ok(text) => Ok(classify_clipboard_text(&text)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(e) => Err(AppError::Clipboard(e.to_string())),
    }
}

/// 将纯文本写入剪贴板，自动使用 IgnoreGuard 防止重复捕获
pub fn write_text(text: &str) -> Result<(), AppError> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| AppError::Clipboard(e.to_string()))?;

    let guard = IgnoreGuard::new();
    clipboard
        .set_text(text)
        .map_err(|e| AppError::Clipboard(e.to_string()))?;
    guard.commit();
    Ok(())
}
