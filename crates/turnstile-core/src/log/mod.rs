//! Log - メッセージキューとログシンク
//!
//! # 学習ポイント
//! - Mutex + Condvar による producer/consumer
//! - ロックはキュー操作の間だけ持ち、I/O の間は離す
//! - グローバル変数ではなく、コンテキストを `Arc` で共有する
//!
//! # 構成
//! - **LogContext**: キュー・ロック・Condvar・2 つの停止フラグを持つ
//! - **sink**: キューを吸い出して書き込むコンシューマスレッド

pub mod sink;

pub use self::sink::{SinkError, SinkHandle, SinkReport, start_log_sink, start_log_sink_with};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Mutex で守られるキューの中身
///
/// 停止フラグもここに置き、wait の述語と同じロックで読み書きする。
#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<String>,
    shutdown: bool,
}

/// LogContext はキューと停止フラグをまとめたもの
///
/// # 使用例
/// ```ignore
/// let ctx = Arc::new(LogContext::new());
/// let sink = start_log_sink(Arc::clone(&ctx), "turnstile.log")?;
/// ctx.append("hello");
/// ```
///
/// # 停止フラグ
/// - ログ側: `QueueState::shutdown`（キューのロック下）
/// - StatusUpdater 側: `updater_stop`（ループ先頭でだけ読む）
///
/// どちらも false → true の一方向にしか変わらない。
#[derive(Debug, Default)]
pub struct LogContext {
    state: Mutex<QueueState>,
    condvar: Condvar,
    updater_stop: AtomicBool,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// メッセージを末尾に追加して、待機中のコンシューマを 1 つ起こす
    ///
    /// 書き込み完了は待たない。シンクが既に終了していた場合、
    /// メッセージはキューに残ったまま誰にも読まれない。
    pub fn append(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.messages.push_back(message.into());
        drop(state);
        self.condvar.notify_one();
    }

    /// ログ側の停止要求（ロック下でフラグを立ててから通知）
    pub fn request_log_shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        drop(state);
        self.condvar.notify_all();
    }

    #[cfg(test)]
    fn log_shutdown_requested(&self) -> bool {
        self.lock().shutdown
    }

    /// StatusUpdater 側の停止要求
    pub fn request_updater_stop(&self) {
        self.updater_stop.store(true, Ordering::SeqCst);
    }

    pub fn updater_stop_requested(&self) -> bool {
        self.updater_stop.load(Ordering::SeqCst)
    }

    /// まだ吸い出されていないメッセージ数
    pub fn pending(&self) -> usize {
        self.lock().messages.len()
    }

    /// キューが空でなくなるか停止要求が来るまで待ち、溜まっている分を全部取り出す
    ///
    /// 停止要求済みかつキューが空なら `None`（コンシューマ終了の合図）。
    /// 取り出した後はロックを離すので、呼び出し側は I/O 中にロックを持たない。
    pub(crate) fn next_batch(&self) -> Option<VecDeque<String>> {
        let guard = self.lock();
        let mut state = self
            .condvar
            .wait_while(guard, |s| s.messages.is_empty() && !s.shutdown)
            .unwrap_or_else(PoisonError::into_inner);

        if state.messages.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut state.messages))
    }
}
