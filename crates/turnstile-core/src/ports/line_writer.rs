//! LineWriter port - ログシンクの書き込み先
//!
//! LogSink のコンシューマはキューから取り出したメッセージを
//! ロックを離した状態でここに書き込む。

use std::io;

/// LineWriter は 1 メッセージ = 1 行の追記先
///
/// # 設計原則
/// - `write_line` は改行を自分で付ける
/// - `flush` はドレイン 1 回ごとに呼ばれる
pub trait LineWriter: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
