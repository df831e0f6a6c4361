//! 单实例控制
//!
//! # 设计思路
//!
//! 第一个进程在回环地址上监听一个随机端口，并把端口号写入数据目录下的端口文件；
//! 后续进程读取端口文件并尝试连接，连接成功即说明已有实例在运行，
//! 发送一行 `SHOW` 后立即退出，不创建第二个界面。
//!
//! # 实现思路
//!
//! - 连接使用 500ms 超时；端口文件残留（进程崩溃）时连接失败，当前进程接管为主实例。
//! - 监听线程逐个接受连接，读取一行信号，收到 `SHOW` 时回调投递事件。
//! - [`InstanceGuard`] 在主实例退出时删除端口文件（仅当文件仍指向自己的端口）。

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::AppError;

/// 唤起已运行实例的信号
pub const SHOW_SIGNAL: &str = "SHOW";

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// 启动时的实例角色
pub enum InstanceRole {
    /// 当前进程是唯一实例，持有监听端口
    Primary(InstanceServer),
    /// 已有实例在运行，`SHOW` 信号已送达
    Secondary,
}

/// 主实例的监听端
pub struct InstanceServer {
    listener: TcpListener,
    port_file: PathBuf,
    port: u16,
}

/// 主实例存活期间持有；释放时清理端口文件
pub struct InstanceGuard {
    port_file: PathBuf,
    port: u16,
}

/// 探测已有实例，或成为主实例
pub fn acquire(port_file: &Path) -> Result<InstanceRole, AppError> {
    if let Some(port) = read_port(port_file) {
        match signal_show(port) {
            Ok(()) => {
                log::info!("检测到已运行的实例（端口 {port}），已发送 {SHOW_SIGNAL}");
                return Ok(InstanceRole::Secondary);
            }
            Err(e) => log::info!("端口文件已失效，接管为主实例: {e}"),
        }
    }

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .map_err(|e| AppError::Ipc(format!("绑定单实例端口失败: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| AppError::Ipc(format!("读取单实例端口失败: {e}")))?
        .port();
    crate::shelf::persist::write_json_atomic(port_file, &port, false)?;
    log::info!("单实例监听已就绪: 127.0.0.1:{port}");

    Ok(InstanceRole::Primary(InstanceServer {
        listener,
        port_file: port_file.to_path_buf(),
        port,
    }))
}

fn read_port(port_file: &Path) -> Option<u16> {
    let content = fs::read_to_string(port_file).ok()?;
    serde_json::from_str::<u16>(content.trim()).ok()
}

/// 向指定端口发送 `SHOW` 信号
pub fn signal_show(port: u16) -> Result<(), AppError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| AppError::Ipc(format!("连接 {addr} 失败: {e}")))?;
    stream
        .set_write_timeout(Some(CONNECT_TIMEOUT))
        .map_err(|e| AppError::Ipc(format!("设置写超时失败: {e}")))?;
    writeln!(stream, "{SHOW_SIGNAL}")
        .and_then(|()| stream.flush())
        .map_err(|e| AppError::Ipc(format!("发送 {SHOW_SIGNAL} 失败: {e}")))?;
    Ok(())
}

impl InstanceServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 启动监听线程，每收到一次 `SHOW` 调用一次 `on_show`
    ///
    /// 回调返回 `false` 时线程退出。
    pub fn spawn<F>(self, on_show: F) -> InstanceGuard
    where
        F: Fn() -> bool + Send + 'static,
    {
        let guard = InstanceGuard {
            port_file: self.port_file.clone(),
            port: self.port,
        };
        let listener = self.listener;
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        log::warn!("接受单实例连接失败: {e}");
                        continue;
                    }
                };
                match read_signal(stream) {
                    Ok(signal) if signal == SHOW_SIGNAL => {
                        if !on_show() {
                            log::debug!("事件队列已关闭，单实例监听线程退出");
                            break;
                        }
                    }
                    Ok(signal) => log::warn!("忽略未知的单实例信号: {signal:?}"),
                    Err(e) => log::warn!("读取单实例信号失败: {e}"),
                }
            }
        });
        guard
    }
}

fn read_signal(stream: TcpStream) -> Result<String, AppError> {
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|e| AppError::Ipc(format!("设置读超时失败: {e}")))?;
    let mut line = String::new();
    // 信号只有一行，限制读取长度
    BufReader::new(stream.take(64))
        .read_line(&mut line)
        .map_err(|e| AppError::Ipc(e.to_string()))?;
    Ok(line.trim().to_string())
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if read_port(&self.port_file) == Some(self.port) {
            if let Err(e) = fs::remove_file(&self.port_file) {
                log::warn!("清理端口文件失败 {}: {e}", self.port_file.display());
            }
        }
    }
}
