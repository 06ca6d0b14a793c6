//! Services - バックグラウンドタスクの起動と停止
//!
//! LogSink と StatusUpdater をまとめて持ち、決められた順序で止める。
//!
//! # 停止順序
//! 1. キューのロック下でログ側の停止フラグを立てる
//! 2. コンシューマに通知
//! 3. コンシューマの終了を待つ
//! 4. StatusUpdater の停止フラグを立てる
//! 5. StatusUpdater の終了を待つ
//!
//! 3 と 4 の間に StatusUpdater が append したメッセージは、
//! 書き込まれずにキューに残る（失われる）。

use std::sync::Arc;

use tracing::{error, info};

use super::status_updater::{UpdaterHandle, start_status_updater};
use crate::config::Config;
use crate::error::TurnstileError;
use crate::log::{LogContext, SinkHandle, SinkReport, start_log_sink};
use crate::ports::Clock;
use crate::registry::SharedRegistry;

/// shutdown の結果
///
/// 2 回目以降の shutdown では両方 `None`。
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub sink: Option<SinkReport>,
    pub sweeps: Option<u64>,
}

pub struct Services {
    ctx: Arc<LogContext>,
    sink: Option<SinkHandle>,
    updater: Option<UpdaterHandle>,
}

impl Services {
    /// 設定に従って LogSink と StatusUpdater を起動する
    pub fn start(
        config: &Config,
        registry: SharedRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TurnstileError> {
        let ctx = Arc::new(LogContext::new());
        let sink = start_log_sink(Arc::clone(&ctx), &config.log_path)?;
        let mut services = Self::from_parts(ctx, Some(sink), None);

        // 失敗した場合は services の Drop でシンクも止まる
        let updater = start_status_updater(
            Arc::clone(&services.ctx),
            registry,
            config.status_interval_secs,
            clock,
        )?;
        services.updater = Some(updater);

        info!(
            log_path = %config.log_path.display(),
            interval_secs = config.status_interval_secs,
            "background services started"
        );
        Ok(services)
    }

    /// 個別に起動したハンドルを束ねる
    pub fn from_parts(
        ctx: Arc<LogContext>,
        sink: Option<SinkHandle>,
        updater: Option<UpdaterHandle>,
    ) -> Self {
        Self { ctx, sink, updater }
    }

    /// フォアグラウンドからのログ追加
    pub fn append(&self, message: impl Into<String>) {
        self.ctx.append(message);
    }

    /// 決められた順序で停止し、両スレッドの終了を待つ
    ///
    /// 2 回目以降の呼び出しは何もしない。
    pub fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if let Some(sink) = self.sink.take() {
            self.ctx.request_log_shutdown();
            match sink.join() {
                Ok(sink_report) => report.sink = Some(sink_report),
                Err(err) => error!(error = %err, "log sink did not terminate cleanly"),
            }
        }

        if let Some(updater) = self.updater.take() {
            self.ctx.request_updater_stop();
            match updater.join() {
                Ok(sweeps) => report.sweeps = Some(sweeps),
                Err(err) => error!(error = %err, "status updater did not terminate cleanly"),
            }
        }

        if report.sink.is_some() || report.sweeps.is_some() {
            info!(unwritten = self.ctx.pending(), "background services stopped");
        }
        report
    }

    /// async コンテキストから停止する
    ///
    /// join はブロッキングなので spawn_blocking に逃がす。
    pub async fn shutdown_async(mut self) -> ShutdownReport {
        match tokio::task::spawn_blocking(move || self.shutdown()).await {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "shutdown task failed");
                ShutdownReport::default()
            }
        }
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        self.shutdown();
    }
}
