//! 链接标题后台抓取
//!
//! # 设计思路
//!
//! 新增链接条目后在后台抓取网页 `<title>`，结果只通过回调（通常是事件队列）交还给
//! 持有仓库的事件循环线程，后台任务从不直接修改仓库。
//!
//! - 抓取有 5 秒超时，响应体最多读取 256 KiB。
//! - 条目在抓取完成前被删除时任务被中止；即便结果已在路上，
//!   事件循环也会按内容匹配丢弃过期结果。
//!
//! # 实现思路
//!
//! - `TitleFetcher` 自带一个 `tokio` 多线程运行时，只承载标题抓取任务。
//! - 每个链接至多一个在途任务，用 `AbortHandle` 索引以便取消。
//! - 标题提取使用 `once_cell::sync::Lazy` 预编译的正则。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::runtime::Runtime;
use tokio::task::AbortHandle;

use crate::error::AppError;
use crate::launcher::normalize_url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_BODY_BYTES: usize = 256 * 1024;
const MAX_TITLE_CHARS: usize = 200;

static TITLE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("静态正则表达式")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("静态正则表达式"));

/// 抓取结果回调：`(原始链接, 标题)`；返回 `false` 表示下游已关闭
pub type TitleSink = Arc<dyn Fn(String, String) -> bool + Send + Sync>;

/// 从 HTML 中提取标题：折叠空白、解码常见实体、截断过长标题
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_TAG.captures(html)?.get(1)?.as_str();
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    let decoded = decode_entities(&collapsed);
    let title: String = decoded.chars().take(MAX_TITLE_CHARS).collect();
    (!title.is_empty()).then_some(title)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// 创建抓取用的 HTTP 客户端
pub fn build_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .no_proxy()
        .build()
        .map_err(|e| AppError::Network(format!("无法创建 HTTP 客户端：{}", e)))
}

fn map_reqwest_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Network(format!("请求超时（{}秒）", FETCH_TIMEOUT.as_secs()))
    } else if e.is_connect() {
        AppError::Network(format!("无法连接：{}", e))
    } else {
        AppError::Network(format!("请求失败：{}", e))
    }
}

/// 抓取单个链接的标题；页面没有标题时返回 `Ok(None)`
pub async fn fetch_title(client: &reqwest::Client, url: &str) -> Result<Option<String>, AppError> {
    let work = async {
        let mut response = client
            .get(normalize_url(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!("HTTP {}", response.status().as_u16())));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            let room = MAX_BODY_BYTES - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= MAX_BODY_BYTES {
                break;
            }
        }
        Ok::<_, AppError>(extract_title(&String::from_utf8_lossy(&body)))
    };

    tokio::time::timeout(FETCH_TIMEOUT, work)
        .await
        .map_err(|_| AppError::Network(format!("请求超时（{}秒）", FETCH_TIMEOUT.as_secs())))?
}

/// 后台标题抓取器
pub struct TitleFetcher {
    runtime: Runtime,
    client: reqwest::Client,
    sink: TitleSink,
    in_flight: HashMap<String, AbortHandle>,
}

impl TitleFetcher {
    pub fn new(sink: TitleSink) -> Result<Self, AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("title-fetch")
            .enable_all()
            .build()
            .map_err(|e| AppError::Network(format!("创建后台运行时失败: {e}")))?;
        Ok(Self {
            runtime,
            client: build_client()?,
            sink,
            in_flight: HashMap::new(),
        })
    }

    /// 为链接启动抓取；同一链接已有在途任务时不重复启动
    pub fn request(&mut self, url: &str) {
        self.in_flight.retain(|_, handle| !handle.is_finished());
        if self.in_flight.contains_key(url) {
            return;
        }

        let client = self.client.clone();
        let sink = Arc::clone(&self.sink);
        let owned = url.to_string();
        let handle = self.runtime.spawn(async move {
            match fetch_title(&client, &owned).await {
                Ok(Some(title)) => {
                    log::debug!("标题抓取完成: {owned} -> {title}");
                    if !sink(owned, title) {
                        log::debug!("事件队列已关闭，丢弃标题结果");
                    }
                }
                Ok(None) => log::debug!("页面没有标题: {owned}"),
                Err(e) => log::info!("标题抓取失败 {owned}: {e}"),
            }
        });
        self.in_flight.insert(url.to_string(), handle.abort_handle());
    }

    /// 取消链接的在途抓取（条目被删除或编辑时调用）
    pub fn cancel(&mut self, url: &str) {
        if let Some(handle) = self.in_flight.remove(url) {
            handle.abort();
            log::debug!("已取消标题抓取: {url}");
        }
    }

    /// 结果已交付，移除索引
    pub fn complete(&mut self, url: &str) {
        self.in_flight.remove(url);
    }
}

impl Drop for TitleFetcher {
    fn drop(&mut self) {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
    }
}
