use crate::store::{FilesystemFunctionStore, FunctionStore, NoopFunctionStore};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zstd1,
    Zstd3,
}

impl Compression {
    pub fn zstd_level(&self) -> Option<i32> {
        match self {
            Compression::None => None,
            Compression::Zstd1 => Some(1),
            Compression::Zstd3 => Some(3),
        }
    }
}

/// Where cached function lists are persisted.
#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum FunctionStoreConfig {
    #[default]
    Noop,
    Filesystem {
        base_dir: String,
        #[serde(default)]
        compression: Compression,
    },
}

impl FunctionStoreConfig {
    pub fn build(&self) -> Arc<dyn FunctionStore> {
        match self {
            FunctionStoreConfig::Noop => Arc::new(NoopFunctionStore),
            FunctionStoreConfig::Filesystem {
                base_dir,
                compression,
            } => Arc::new(FilesystemFunctionStore::new(base_dir, *compression)),
        }
    }
}
