//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **AppendFileWriter**: 追記モードのファイル（本番用）
//! - **MemoryWriter**: メモリ上のバッファ（開発・テスト用）

pub mod file_writer;
pub mod memory_writer;

pub use self::file_writer::AppendFileWriter;
pub use self::memory_writer::MemoryWriter;
