//! Errors - エントリ単位のステータス確認エラー
//!
//! ステータス確認の失敗は例外ではなく `Result` で返す。
//! StatusUpdater はこれをその場でログメッセージに変換し、外へは伝播させない。

use chrono::NaiveDate;
use thiserror::Error;

/// EntryCheckError は 1 エントリのステータス再評価の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryCheckError {
    /// 有効期限切れ
    #[error("subscription expired on {expired_on}")]
    Expired { expired_on: NaiveDate },
}
