//! Client - 登録簿のエントリ
//!
//! `active` はキャッシュされたステータスで、StatusUpdater が
//! 登録簿ロックの下で `refresh_status()` を呼んだときだけ書き換わる。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::EntryCheckError;
use super::ids::ClientId;
use super::subscription::Subscription;

/// 来館記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub date: NaiveDate,
    pub notes: String,
}

impl Visit {
    pub fn new(date: NaiveDate, notes: impl Into<String>) -> Self {
        Self {
            date,
            notes: notes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    id: ClientId,
    name: String,
    subscription: Subscription,
    active: bool,
    visits: Vec<Visit>,
}

impl Client {
    /// 新しいクライアントを作成し、`now` 時点のステータスを計算する
    pub fn new(
        id: ClientId,
        name: impl Into<String>,
        subscription: Subscription,
        now: DateTime<Utc>,
    ) -> Self {
        let active = subscription.is_active(now);
        Self {
            id,
            name: name.into(),
            subscription,
            active,
            visits: Vec::new(),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// 最後に評価されたステータス
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// ステータスを再評価して `active` を更新する
    ///
    /// 期限切れなら `active = false` にした上で Err を返す。
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> Result<(), EntryCheckError> {
        let result = self.subscription.check(now);
        self.active = result.is_ok();
        result
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn add_visit(&mut self, visit: Visit) {
        self.visits.push(visit);
    }

    pub fn visit_mut(&mut self, index: usize) -> Option<&mut Visit> {
        self.visits.get_mut(index)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client {} ({}) | {} until {} | {}",
            self.id,
            self.name,
            self.subscription.kind,
            self.subscription.expires_on,
            if self.active { "Active" } else { "Expired" }
        )
    }
}
