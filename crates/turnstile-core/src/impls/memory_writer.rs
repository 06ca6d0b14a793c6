//! MemoryWriter - 開発・テスト用の書き込み先
//!
//! clone したハンドル同士で同じバッファを共有するので、
//! シンクに渡した後でも書き込まれた行を読み出せる。

use std::io;
use std::sync::{Arc, Mutex};

use crate::ports::LineWriter;

#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに書き込まれた行のスナップショット
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LineWriter for MemoryWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("memory writer poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}
