use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::log::SinkError;
use crate::registry::{RegistryError, StoreError};

#[derive(Debug, Error)]
pub enum TurnstileError {
    #[error("status interval must be a positive number of seconds (got {0})")]
    InvalidInterval(u64),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    Panicked(&'static str),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
