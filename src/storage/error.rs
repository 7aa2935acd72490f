use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// I/O failure on the backing ledger file, tagged with the step that failed.
/// Never retried by the store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read ledger {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write ledger {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to sync ledger {}: {source}", .path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to replace ledger {}: {source}", .path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode ledger: {0}")]
    Encode(#[from] csv::Error),

    /// The task running a locked cycle was cancelled by runtime shutdown.
    #[error("Ledger cycle on {} was interrupted", .path.display())]
    Interrupted { path: PathBuf },
}

impl StorageError {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            StorageError::Read { path, .. }
            | StorageError::Create { path, .. }
            | StorageError::Write { path, .. }
            | StorageError::Sync { path, .. }
            | StorageError::Rename { path, .. }
            | StorageError::Interrupted { path } => Some(path),
            StorageError::Encode(_) => None,
        }
    }
}
