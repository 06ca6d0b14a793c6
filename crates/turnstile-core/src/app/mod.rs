//! App - アプリケーション層
//!
//! LogContext・登録簿・Clock を組み合わせてバックグラウンド処理を動かす。
//!
//! # 主要コンポーネント
//! - **StatusUpdater**: 登録簿の定期スイープ
//! - **Services**: LogSink と StatusUpdater の起動・順序付き停止

pub mod services;
pub mod status_updater;

pub use self::services::{Services, ShutdownReport};
pub use self::status_updater::{UpdaterHandle, start_status_updater, sweep_once};
