//! Telemetry - 運用ログ（tracing）の初期化
//!
//! ステータスログ（LogSink の書き込み先）とは別物。
//! こちらはプロセスの診断用で、`RUST_LOG` でフィルタできる。

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// fmt レイヤーを stderr に登録する（2 回目以降は何もしない）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already initialized");
    }
}
