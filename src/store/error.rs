//! Trigger store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while persisting the trigger timestamp.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the state file failed.
    #[error("状態ファイルの読み込みに失敗しました: {path}: {source}")]
    Read {
        /// State file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Writing the state file failed.
    #[error("状態ファイルの書き込みに失敗しました: {path}: {source}")]
    Write {
        /// State file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but cannot be parsed.
    #[error("状態ファイルが壊れています: {path}: {source}")]
    Corrupt {
        /// State file path
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Failure injected by a test store.
    #[error("ストアが利用できません: {0}")]
    Unavailable(String),
}
