//! 剪贴板变化监听
//!
//! 监听线程由 `clipboard-master` 驱动，对外部变化做轻量节流（尾沿补发），
//! 节流通过后调用上层回调。监听器异常退出时按指数退避自动重启。

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use clipboard_master::{CallbackResult, ClipboardHandler, Master};

use super::{is_monitoring_enabled, take_ignore_flag};

const CLIPBOARD_EVENT_MIN_INTERVAL_MS: u64 = 80;
const MONITOR_RESTART_BASE_DELAY_MS: u64 = 100;
const MONITOR_RESTART_MAX_DELAY_MS: u64 = 5_000;

/// 节流通过后的回调；返回 `false` 表示下游已关闭，监听线程随之退出
pub type ChangeCallback = Arc<dyn Fn() -> bool + Send + Sync>;

fn compute_restart_backoff_ms(restart_attempt: u32) -> u64 {
    let exp = 1_u64 << restart_attempt.saturating_sub(1).min(6);
    MONITOR_RESTART_BASE_DELAY_MS
        .saturating_mul(exp)
        .min(MONITOR_RESTART_MAX_DELAY_MS)
}

fn debounce_remaining(elapsed: Duration, min_interval: Duration) -> Option<Duration> {
    if elapsed >= min_interval {
        None
    } else {
        Some(min_interval - elapsed)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DebounceDecision {
    EmitNow,
    Throttle {
        remaining: Duration,
        start_tail_worker: bool,
    },
}

fn decide_debounce_action(
    elapsed: Duration,
    min_interval: Duration,
    tail_worker_running: bool,
) -> DebounceDecision {
    match debounce_remaining(elapsed, min_interval) {
        Some(remaining) => DebounceDecision::Throttle {
            remaining,
            start_tail_worker: !tail_worker_running,
        },
        None => DebounceDecision::EmitNow,
    }
}

#[derive(Debug, Default)]
struct DebounceState {
    last_external_emit_at: Option<Instant>,
    pending_external_change: bool,
    tail_worker_running: bool,
    /// 下游已关闭
    closed: bool,
}

fn lock_state(state: &Mutex<DebounceState>) -> std::sync::MutexGuard<'_, DebounceState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("剪贴板节流状态锁中毒，继续使用恢复数据");
            poisoned.into_inner()
        }
    }
}

/// 剪贴板事件处理器（内部实现）
///
/// 过滤货架自身触发的变化与暂停期间的变化，并对外部变化做节流。
struct Handler {
    on_change: ChangeCallback,
    debounce_state: Arc<Mutex<DebounceState>>,
}

impl Handler {
    fn new(on_change: ChangeCallback) -> Self {
        Self {
            on_change,
            debounce_state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    fn emit(on_change: &ChangeCallback, state: &Mutex<DebounceState>) {
        if !on_change() {
            lock_state(state).closed = true;
        }
    }

    fn spawn_tail_worker(&self, initial_wait: Duration) {
        let on_change = Arc::clone(&self.on_change);
        let debounce_state = Arc::clone(&self.debounce_state);

        thread::spawn(move || {
            let mut wait_for = initial_wait;

            loop {
                if !wait_for.is_zero() {
                    thread::sleep(wait_for);
                }

                let now = Instant::now();
                let min_interval = Duration::from_millis(CLIPBOARD_EVENT_MIN_INTERVAL_MS);

                {
                    let mut state = lock_state(&debounce_state);

                    if !state.pending_external_change {
                        state.tail_worker_running = false;
                        return;
                    }

                    let elapsed = state
                        .last_external_emit_at
                        .map(|last| now.saturating_duration_since(last))
                        .unwrap_or(min_interval);

                    if let Some(remaining) = debounce_remaining(elapsed, min_interval) {
                        wait_for = remaining;
                        continue;
                    }

                    state.pending_external_change = false;
                    state.last_external_emit_at = Some(now);
                    state.tail_worker_running = false;
                }

                Self::emit(&on_change, &debounce_state);
                return;
            }
        });
    }
}

impl ClipboardHandler for Handler {
    fn on_clipboard_change(&mut self) -> CallbackResult {
        if take_ignore_flag() {
            log::debug!("⏭️  忽略货架主动触发的剪贴板变化");
            return CallbackResult::Next;
        }
        if !is_monitoring_enabled() {
            log::trace!("剪贴板捕获已暂停，跳过本次变化");
            return CallbackResult::Next;
        }

        let now = Instant::now();
        let min_interval_ms = CLIPBOARD_EVENT_MIN_INTERVAL_MS;
        let min_interval = Duration::from_millis(min_interval_ms);
        let mut emit_now = false;
        let mut schedule_tail_wait = None;

        {
            let mut state = lock_state(&self.debounce_state);
            if state.closed {
                return CallbackResult::Stop;
            }

            let elapsed = state
                .last_external_emit_at
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or(min_interval);

            match decide_debounce_action(elapsed, min_interval, state.tail_worker_running) {
                DebounceDecision::Throttle {
                    remaining,
                    start_tail_worker,
                } => {
                    state.pending_external_change = true;
                    if start_tail_worker {
                        state.tail_worker_running = true;
                        schedule_tail_wait = Some(remaining);
                    }
                    log::trace!(
                        "⏱️ 剪贴板变化事件节流：{}ms < {}ms（尾沿补发）",
                        elapsed.as_millis(),
                        min_interval_ms
                    );
                }
                DebounceDecision::EmitNow => {
                    state.last_external_emit_at = Some(now);
                    state.pending_external_change = false;
                    emit_now = true;
                }
            }
        }

        if let Some(wait_for) = schedule_tail_wait {
            self.spawn_tail_worker(wait_for);
        }

        if emit_now {
            Self::emit(&self.on_change, &self.debounce_state);
        }

        CallbackResult::Next
    }

    fn on_clipboard_error(&mut self, error: std::io::Error) -> CallbackResult {
        log::error!("剪贴板错误：{}", error);
        CallbackResult::Next
    }
}

/// 在后台线程启动剪贴板监控
///
/// # 参数
/// * `on_change` - 节流通过后的回调，通常读取剪贴板并投递到事件队列
pub fn start_monitoring<F>(on_change: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let on_change: ChangeCallback = Arc::new(on_change);

    thread::spawn(move || {
        let mut restart_attempt: u32 = 0;
        loop {
            let handler = Handler::new(Arc::clone(&on_change));
            let debounce_state = Arc::clone(&handler.debounce_state);
            match Master::new(handler) {
                Ok(mut master) => {
                    restart_attempt = 0;
                    log::info!("📋 剪贴板监听已启动");
                    if let Err(err) = master.run() {
                        log::warn!("📋 剪贴板监听异常退出: {}", err);
                    }
                    if lock_state(&debounce_state).closed {
                        log::info!("📋 事件队列已关闭，剪贴板监听停止");
                        return;
                    }
                    log::warn!("📋 剪贴板监听已退出，将尝试重启");
                }
                Err(err) => {
                    log::error!("📋 创建剪贴板监听失败: {}", err);
                }
            }

            restart_attempt = restart_attempt.saturating_add(1);
            let backoff_ms = compute_restart_backoff_ms(restart_attempt);
            log::warn!("📋 剪贴板监听 {}ms 后重试（attempt={}）", backoff_ms, restart_attempt);
            thread::sleep(Duration::from_millis(backoff_ms));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{
        compute_restart_backoff_ms, debounce_remaining, decide_debounce_action, DebounceDecision,
    };
    use std::time::Duration;

    #[test]
    fn debounce_remaining_returns_expected_values() {
        let min = Duration::from_millis(80);
        assert_eq!(debounce_remaining(Duration::from_millis(20), min), Some(Duration::from_millis(60)));
        assert_eq!(debounce_remaining(Duration::from_millis(80), min), None);
        assert_eq!(debounce_remaining(Duration::from_millis(120), min), None);
    }

    #[test]
    fn debounce_decision_emit_now_when_interval_reached() {
        let decision = decide_debounce_action(
            Duration::from_millis(80),
            Duration::from_millis(80),
            false,
        );
        assert_eq!(decision, DebounceDecision::EmitNow);
    }

    #[test]
    fn debounce_decision_starts_tail_worker_only_once() {
        let first = decide_debounce_action(
            Duration::from_millis(20),
            Duration::from_millis(80),
            false,
        );
        assert_eq!(
            first,
            DebounceDecision::Throttle {
                remaining: Duration::from_millis(60),
                start_tail_worker: true,
            }
        );

        let second = decide_debounce_action(
            Duration::from_millis(10),
            Duration::from_millis(80),
            true,
        );
        assert_eq!(
            second,
            DebounceDecision::Throttle {
                remaining: Duration::from_millis(70),
                start_tail_worker: false,
            }
        );
    }

    #[test]
    fn restart_backoff_grows_then_caps() {
        assert_eq!(compute_restart_backoff_ms(1), 100);
        assert_eq!(compute_restart_backoff_ms(2), 200);
        assert_eq!(compute_restart_backoff_ms(3), 400);
        assert_eq!(compute_restart_backoff_ms(7), 5_000);
        assert_eq!(compute_restart_backoff_ms(20), 5_000);
    }
}
