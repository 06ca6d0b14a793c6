//! AppendFileWriter - 追記モードのファイル書き込み先
//!
//! 既存の内容は残したまま末尾に追記する（ローテーションもサイズ上限もなし）。

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::ports::LineWriter;

pub struct AppendFileWriter {
    out: BufWriter<File>,
}

impl AppendFileWriter {
    /// ファイルを append + create で開く
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl LineWriter for AppendFileWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
