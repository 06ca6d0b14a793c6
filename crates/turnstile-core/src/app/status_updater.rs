//! StatusUpdater - 登録簿の定期スイープ
//!
//! # フロー
//! 1. ループ先頭で停止フラグを確認
//! 2. 登録簿をロックして全エントリを再評価（スイープ）
//! 3. ロックを離してから、結果メッセージを LogContext に append
//! 4. 周期いっぱい sleep
//!
//! sleep 中は停止フラグを見ないので、停止までの遅延は最大で 1 周期。

use std::fmt;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::TurnstileError;
use crate::log::LogContext;
use crate::ports::Clock;
use crate::registry::SharedRegistry;

const UPDATER_THREAD_NAME: &str = "turnstile-status-updater";

/// 起動中の StatusUpdater
pub struct UpdaterHandle {
    join: JoinHandle<u64>,
}

impl UpdaterHandle {
    /// 終了を待ち、実行したスイープ回数を返す
    pub fn join(self) -> Result<u64, TurnstileError> {
        self.join
            .join()
            .map_err(|_| TurnstileError::Panicked(UPDATER_THREAD_NAME))
    }
}

/// 秒単位の周期で StatusUpdater を起動する
pub fn start_status_updater(
    ctx: Arc<LogContext>,
    registry: SharedRegistry,
    interval_secs: u64,
    clock: Arc<dyn Clock>,
) -> Result<UpdaterHandle, TurnstileError> {
    if interval_secs == 0 {
        return Err(TurnstileError::InvalidInterval(interval_secs));
    }
    spawn(ctx, registry, Duration::from_secs(interval_secs), clock)
}

/// 任意の周期で起動する（テストで秒未満の周期を使うため）
pub fn spawn(
    ctx: Arc<LogContext>,
    registry: SharedRegistry,
    interval: Duration,
    clock: Arc<dyn Clock>,
) -> Result<UpdaterHandle, TurnstileError> {
    if interval.is_zero() {
        return Err(TurnstileError::InvalidInterval(0));
    }

    let join = thread::Builder::new()
        .name(UPDATER_THREAD_NAME.to_string())
        .spawn(move || {
            info!(interval = ?interval, "status updater started");
            let mut sweeps = 0u64;
            loop {
                if ctx.updater_stop_requested() {
                    break;
                }
                sweep_once(&ctx, &registry, clock.as_ref());
                sweeps += 1;
                thread::sleep(interval);
            }
            info!(sweeps, "status updater stopped");
            sweeps
        })
        .map_err(|source| TurnstileError::Spawn {
            name: UPDATER_THREAD_NAME,
            source,
        })?;

    Ok(UpdaterHandle { join })
}

/// 1 回分のスイープ
///
/// ロックはスイープ全体で保持し、append の前に離す。
pub fn sweep_once(ctx: &LogContext, registry: &SharedRegistry, clock: &dyn Clock) -> usize {
    let now = clock.now();
    let messages = {
        let mut reg = registry.lock().unwrap_or_else(PoisonError::into_inner);
        reg.sweep(now)
    };

    let stamp = stamp_in(now, &Local);
    let count = messages.len();
    for message in messages {
        ctx.append(format!("[{stamp}] {message}"));
    }
    debug!(entries = count, "status sweep finished");
    count
}

/// メッセージ先頭のタイムスタンプ（`tz` の時刻 + オフセット）
pub(crate) fn stamp_in<Tz>(now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    now.with_timezone(tz)
        .format("%Y-%m-%d %H:%M:%S%:z")
        .to_string()
}
