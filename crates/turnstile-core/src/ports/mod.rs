//! Ports - 抽象化レイヤー
//!
//! 外部への依存（時刻、ログの書き込み先）を trait で切り出す。
//! 実装は `impls` にある。

pub mod clock;
pub mod line_writer;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::line_writer::LineWriter;
