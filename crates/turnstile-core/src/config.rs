//! Config - 設定ファイル（JSON）
//!
//! 全フィールドにデフォルトがあるので、ファイルは部分的でよい。
//! CLI のフラグは読み込み後に上書きする。

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("status_interval_secs must be greater than zero")]
    InvalidInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// ステータスログの追記先
    pub log_path: PathBuf,
    /// 登録簿の保存先
    pub data_path: PathBuf,
    /// StatusUpdater の周期（秒）
    pub status_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("turnstile.log"),
            data_path: PathBuf::from("clients.txt"),
            status_interval_secs: 10,
        }
    }
}

impl Config {
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// パスが無ければデフォルト
    pub fn from_optional_path(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }
}
