//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，条目仓库、历史记录、持久化、剪贴板、
//! 快捷键与单实例通道共用同一套错误类型，调用侧按分支决定恢复策略：
//!
//! - 持久化 I/O 失败：在上下文内部记录日志并回退，不向事件循环传播。
//! - 外部资源失败（文件缺失、链接不可达、快捷键被占用）：放弃该动作，应用继续运行。
//! - 输入校验失败：静默拒绝，保留旧值。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `std::io::Error` 与 `serde_json::Error` 提供 `From` 转换，`?` 直接上抛。
//! - 实现 `Serialize` 将错误序列化为字符串，便于日后接入前端 IPC。

use serde::Serialize;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 快照序列化 / 反序列化失败
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 数据目录或快照文件不可用
    #[error("存储不可用: {0}")]
    Storage(String),

    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 全局快捷键解析或注册失败
    #[error("快捷键错误: {0}")]
    Hotkey(String),

    /// 单实例通道失败
    #[error("单实例通道错误: {0}")]
    Ipc(String),

    /// 链接标题抓取失败
    #[error("网络错误: {0}")]
    Network(String),

    /// 打开文件 / 链接失败
    #[error("打开失败: {0}")]
    Launch(String),

    /// 用户输入校验失败
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 目标条目不存在（可能已被删除）
    #[error("条目不存在: {0}")]
    ItemNotFound(String),

    /// 与已有条目 `(kind, content)` 冲突
    #[error("条目已存在: {0}")]
    Duplicate(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
