//! turnstile-core
//!
//! ジム会員登録簿と、そのステータスログ処理のコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ClientId, Client, Visit, Subscription, EntryCheckError）
//! - **ports**: 抽象化レイヤー（Clock, LineWriter）
//! - **impls**: ports の実装（AppendFileWriter, MemoryWriter）
//! - **log**: メッセージキュー（LogContext）とログシンク
//! - **registry**: 登録簿と、そのテキストファイル保存
//! - **app**: StatusUpdater と Services（起動・停止の順序）
//! - **config**: 設定ファイル
//! - **telemetry**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod log;
pub mod ports;
pub mod registry;
pub mod telemetry;

pub use app::{Services, ShutdownReport};
pub use config::Config;
pub use error::TurnstileError;
pub use log::LogContext;
pub use registry::{Registry, SharedRegistry};
