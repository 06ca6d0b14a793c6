//! LogSink - キューのコンシューマスレッド
//!
//! # 状態遷移
//! Idle（Condvar で待機）→ Draining（ロック下で取り出し）→ Writing（ロック解放後に書き込み）
//! → キューが空なら Idle、停止要求済みかつ空なら Terminated
//!
//! # 失敗時の方針
//! - 書き込み先を開けなかった: 1 回だけ報告し、以降は読み捨てる（producer を詰まらせない）
//! - 1 行の書き込みに失敗した: warn を出してその行を捨て、続行する
//!
//! メッセージ中の改行は `\n` / `\r` の 2 文字にエスケープし、1 メッセージ = 1 行を保つ。

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::LogContext;
use crate::impls::AppendFileWriter;
use crate::ports::LineWriter;

const SINK_THREAD_NAME: &str = "turnstile-log-sink";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open log sink {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn log sink thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("log sink thread panicked")]
    Panicked,
}

/// コンシューマ終了時の集計
#[derive(Debug, Default)]
pub struct SinkReport {
    /// 書き込めた行数
    pub written: usize,
    /// 読み捨てた行数（オープン失敗 or 書き込み失敗）
    pub discarded: usize,
    /// オープン失敗の内容（あれば）
    pub open_error: Option<SinkError>,
}

/// 起動中のシンクスレッド
pub struct SinkHandle {
    join: JoinHandle<SinkReport>,
}

impl SinkHandle {
    /// スレッドの終了を待つ
    ///
    /// 停止要求は呼び出し側（`Services::shutdown`）の責務。
    /// 要求なしに呼ぶと、キューが空のまま永久に待つ。
    pub fn join(self) -> Result<SinkReport, SinkError> {
        self.join.join().map_err(|_| SinkError::Panicked)
    }
}

/// 追記モードのファイルを書き込み先にしてシンクを起動する
///
/// ファイルはシンクスレッド内で開く。開けなくても Err にはならず、
/// error ログと `SinkReport::open_error` で 1 回だけ報告される。
pub fn start_log_sink(
    ctx: Arc<LogContext>,
    destination: impl AsRef<Path>,
) -> Result<SinkHandle, SinkError> {
    let path = destination.as_ref().to_path_buf();
    start_log_sink_with(ctx, move || {
        AppendFileWriter::open(&path).map_err(|source| SinkError::Open { path, source })
    })
}

/// 任意の書き込み先でシンクを起動する
pub fn start_log_sink_with<W, F>(ctx: Arc<LogContext>, open: F) -> Result<SinkHandle, SinkError>
where
    W: LineWriter + 'static,
    F: FnOnce() -> Result<W, SinkError> + Send + 'static,
{
    let join = thread::Builder::new()
        .name(SINK_THREAD_NAME.to_string())
        .spawn(move || {
            let mut report = SinkReport::default();
            let writer = match open() {
                Ok(writer) => Some(writer),
                Err(err) => {
                    error!(error = %err, "log sink unavailable; queued messages will be discarded");
                    report.open_error = Some(err);
                    None
                }
            };
            consume(&ctx, writer, &mut report);
            info!(
                written = report.written,
                discarded = report.discarded,
                "log sink terminated"
            );
            report
        })
        .map_err(SinkError::Spawn)?;

    Ok(SinkHandle { join })
}

fn consume<W: LineWriter>(ctx: &LogContext, mut writer: Option<W>, report: &mut SinkReport) {
    while let Some(batch) = ctx.next_batch() {
        debug!(count = batch.len(), "draining log queue");

        let Some(w) = writer.as_mut() else {
            report.discarded += batch.len();
            continue;
        };

        for message in batch {
            match w.write_line(&single_line(&message)) {
                Ok(()) => report.written += 1,
                Err(err) => {
                    warn!(error = %err, "failed to write log line");
                    report.discarded += 1;
                }
            }
        }
        if let Err(err) = w.flush() {
            warn!(error = %err, "failed to flush log sink");
        }
    }
}

/// 改行を含むメッセージをエスケープして 1 行にする
fn single_line(message: &str) -> Cow<'_, str> {
    if !message.contains(['\n', '\r']) {
        return Cow::Borrowed(message);
    }
    Cow::Owned(message.replace('\r', "\\r").replace('\n', "\\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::MemoryWriter;
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    fn memory_sink(ctx: &Arc<LogContext>) -> (SinkHandle, MemoryWriter) {
        let writer = MemoryWriter::new();
        let handle = {
            let writer = writer.clone();
            start_log_sink_with(Arc::clone(ctx), move || Ok(writer)).unwrap()
        };
        (handle, writer)
    }

    /// テスト側が開けるまで write_line で止まる書き込み先
    #[derive(Clone)]
    struct GatedWriter {
        gate: Arc<(Mutex<bool>, Condvar)>,
        inner: MemoryWriter,
    }

    impl GatedWriter {
        fn new() -> Self {
            Self {
                gate: Arc::new((Mutex::new(false), Condvar::new())),
                inner: MemoryWriter::new(),
            }
        }

        fn open_gate(&self) {
            let (lock, cvar) = &*self.gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    impl LineWriter for GatedWriter {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            let (lock, cvar) = &*self.gate;
            let _open = cvar.wait_while(lock.lock().unwrap(), |open| !*open).unwrap();
            self.inner.write_line(line)
        }
    }

    struct FailingWriter;

    impl LineWriter for FailingWriter {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn delivers_in_fifo_order() {
        let ctx = Arc::new(LogContext::new());
        let (handle, writer) = memory_sink(&ctx);

        let expected: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
        for m in &expected {
            ctx.append(m.clone());
        }
        ctx.request_log_shutdown();
        let report = handle.join().unwrap();

        assert_eq!(writer.lines(), expected);
        assert_eq!(report.written, 50);
        assert_eq!(report.discarded, 0);
    }

    #[test]
    fn no_message_appended_before_shutdown_is_lost() {
        let ctx = Arc::new(LogContext::new());
        let (handle, writer) = memory_sink(&ctx);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for i in 0..250 {
                        ctx.append(format!("p{p}-{i}"));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        ctx.request_log_shutdown();
        handle.join().unwrap();

        let lines = writer.lines();
        assert_eq!(lines.len(), 1000);
        // 各 producer 内の順序は保たれる
        for p in 0..4 {
            let prefix = format!("p{p}-");
            let own: Vec<_> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
            let expected: Vec<String> = (0..250).map(|i| format!("p{p}-{i}")).collect();
            assert_eq!(own, expected.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn append_does_not_wait_for_a_blocked_writer() {
        let ctx = Arc::new(LogContext::new());
        let writer = GatedWriter::new();
        let handle = {
            let writer = writer.clone();
            start_log_sink_with(Arc::clone(&ctx), move || Ok(writer)).unwrap()
        };

        ctx.append("first");
        // シンクが "first" を取り出して write_line で止まるのを待つ
        let deadline = Instant::now() + Duration::from_secs(5);
        while ctx.pending() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let started = Instant::now();
        ctx.append("second");
        ctx.append("third");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(writer.inner.lines().is_empty());

        writer.open_gate();
        ctx.request_log_shutdown();
        handle.join().unwrap();
        assert_eq!(writer.inner.lines(), vec!["first", "second", "third"]);
    }

    #[test]
    fn open_failure_degrades_to_discarding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sink.log");
        let ctx = Arc::new(LogContext::new());
        let handle = start_log_sink(Arc::clone(&ctx), &path).unwrap();

        ctx.append("a");
        ctx.append("b");
        ctx.request_log_shutdown();
        let report = handle.join().unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.discarded, 2);
        assert!(matches!(report.open_error, Some(SinkError::Open { .. })));
        assert_eq!(ctx.pending(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn write_failures_are_counted_and_skipped() {
        let ctx = Arc::new(LogContext::new());
        let handle = start_log_sink_with(Arc::clone(&ctx), || Ok(FailingWriter)).unwrap();

        ctx.append("x");
        ctx.append("y");
        ctx.request_log_shutdown();
        let report = handle.join().unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.discarded, 2);
        assert!(report.open_error.is_none());
    }

    #[test]
    fn file_sink_appends_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let ctx = Arc::new(LogContext::new());
        let handle = start_log_sink(Arc::clone(&ctx), &path).unwrap();
        ctx.append("hello");
        ctx.append("world");
        ctx.request_log_shutdown();
        handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "previous run\nhello\nworld\n");
    }

    #[test]
    fn line_breaks_inside_a_message_stay_on_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.log");

        let ctx = Arc::new(LogContext::new());
        let handle = start_log_sink(Arc::clone(&ctx), &path).unwrap();
        ctx.append("Client #1 (Anna\nEVIL): subscription active");
        ctx.append("carriage\r\nreturn");
        ctx.request_log_shutdown();
        let report = handle.join().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().collect::<Vec<_>>(),
            vec![
                "Client #1 (Anna\\nEVIL): subscription active",
                "carriage\\r\\nreturn",
            ]
        );
        assert_eq!(report.written, 2);
    }
}
