//! Subscription - 会員種別と有効期限
//!
//! 種別ごとの振る舞い（ラベル・パース）は enum の match で表現する。

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::errors::EntryCheckError;

/// 会員種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    Standard,
    Premium,
    Student,
}

impl SubscriptionKind {
    pub const ALL: [SubscriptionKind; 3] = [Self::Standard, Self::Premium, Self::Student];

    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Premium => "Premium",
            Self::Student => "Student",
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown subscription kind '{0}' (expected standard, premium or student)")]
pub struct UnknownSubscriptionKind(pub String);

impl FromStr for SubscriptionKind {
    type Err = UnknownSubscriptionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSubscriptionKind(wanted.to_string()))
    }
}

/// Subscription は種別と有効期限の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub kind: SubscriptionKind,
    pub expires_on: NaiveDate,
}

impl Subscription {
    pub fn new(kind: SubscriptionKind, expires_on: NaiveDate) -> Self {
        Self { kind, expires_on }
    }

    /// 有効期限の判定（ローカルタイムゾーン）
    ///
    /// 期限日の 0 時（ローカル）が `now` より前なら期限切れ。
    /// つまり期限日当日も、日付が変わった瞬間から期限切れ扱いになる。
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), EntryCheckError> {
        self.check_in(now, &Local)
    }

    /// 日付の境界を `tz` で決める版
    pub fn check_in<Tz: TimeZone>(
        &self,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<(), EntryCheckError> {
        let midnight = self.expires_on.and_time(NaiveTime::MIN);
        // 0 時が夏時間の切り替えで存在しない日は UTC の 0 時で代用する
        let starts_at = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc());
        if starts_at < now {
            return Err(EntryCheckError::Expired {
                expired_on: self.expires_on,
            });
        }
        Ok(())
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.check(now).is_ok()
    }
}
