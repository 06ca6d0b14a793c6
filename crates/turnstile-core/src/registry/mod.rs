//! Registry - クライアント登録簿
//!
//! CLI から変更され、StatusUpdater からも読み書きされる共有コレクション。
//! 共有は `SharedRegistry`（`Arc<Mutex<Registry>>`）で行う。
//!
//! # ロック粒度
//! スイープは登録簿全体のロックを最後まで保持する。
//! エントリ数が少ない前提の粗いロックで、スイープ中の追加などはその間待たされる。

pub mod store;

pub use self::store::{StoreError, load, save};

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::domain::{Client, ClientId, Visit};

pub type SharedRegistry = Arc<Mutex<Registry>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("client {0} is already registered")]
    DuplicateId(ClientId),

    #[error("client {0} not found")]
    NotFound(ClientId),

    #[error("client {id} has no visit at index {index}")]
    VisitOutOfRange { id: ClientId, index: usize },
}

/// 並べ替えのキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Id,
    Expiration,
}

/// `status` 表示用の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub active: usize,
    pub expired: usize,
    pub visits: usize,
}

/// 登録簿（挿入順を保持）
#[derive(Debug, Clone, Default)]
pub struct Registry {
    clients: Vec<Client>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    /// 既存の最大 ID の次
    pub fn next_id(&self) -> ClientId {
        self.clients
            .iter()
            .map(Client::id)
            .max()
            .map(ClientId::next)
            .unwrap_or(ClientId::new(1))
    }

    pub fn add(&mut self, client: Client) -> Result<ClientId, RegistryError> {
        let id = client.id();
        if self.get(id).is_some() {
            return Err(RegistryError::DuplicateId(id));
        }
        self.clients.push(client);
        Ok(id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.id() == id)
    }

    fn require_mut(&mut self, id: ClientId) -> Result<&mut Client, RegistryError> {
        self.get_mut(id).ok_or(RegistryError::NotFound(id))
    }

    pub fn remove(&mut self, id: ClientId) -> Result<Client, RegistryError> {
        let index = self
            .clients
            .iter()
            .position(|c| c.id() == id)
            .ok_or(RegistryError::NotFound(id))?;
        Ok(self.clients.remove(index))
    }

    pub fn rename(&mut self, id: ClientId, name: impl Into<String>) -> Result<(), RegistryError> {
        self.require_mut(id)?.rename(name);
        Ok(())
    }

    /// 名前の部分一致（大文字小文字を区別しない）
    pub fn search_by_name(&self, query: &str) -> Vec<&Client> {
        let needle = query.trim().to_lowercase();
        self.clients
            .iter()
            .filter(|c| c.name().to_lowercase().contains(&needle))
            .collect()
    }

    /// 安定ソート
    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::Name => self.clients.sort_by(|a, b| a.name().cmp(b.name())),
            SortKey::Id => self.clients.sort_by_key(Client::id),
            SortKey::Expiration => self.clients.sort_by_key(|c| c.subscription().expires_on),
        }
    }

    pub fn record_visit(&mut self, id: ClientId, visit: Visit) -> Result<(), RegistryError> {
        self.require_mut(id)?.add_visit(visit);
        Ok(())
    }

    pub fn edit_visit_date(
        &mut self,
        id: ClientId,
        index: usize,
        date: NaiveDate,
    ) -> Result<(), RegistryError> {
        self.visit_mut(id, index)?.date = date;
        Ok(())
    }

    pub fn edit_visit_notes(
        &mut self,
        id: ClientId,
        index: usize,
        notes: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.visit_mut(id, index)?.notes = notes.into();
        Ok(())
    }

    fn visit_mut(&mut self, id: ClientId, index: usize) -> Result<&mut Visit, RegistryError> {
        self.require_mut(id)?
            .visit_mut(index)
            .ok_or(RegistryError::VisitOutOfRange { id, index })
    }

    pub fn summary(&self) -> Summary {
        self.clients.iter().fold(Summary::default(), |mut acc, c| {
            if c.is_active() {
                acc.active += 1;
            } else {
                acc.expired += 1;
            }
            acc.visits += c.visits().len();
            acc
        })
    }

    /// 全エントリのステータスを登録簿順に再評価し、エントリごとのメッセージを返す
    ///
    /// 1 件の失敗で止まらない。メッセージのキュー投入は呼び出し側が
    /// ロックを離してから行う。
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        self.clients
            .iter_mut()
            .map(|client| match client.refresh_status(now) {
                Ok(()) => format!("Client {} ({}): subscription active", client.id(), client.name()),
                Err(err) => format!(
                    "Client {} ({}): status check failed: {err}",
                    client.id(),
                    client.name()
                ),
            })
            .collect()
    }
}
