use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::Ledger;

use super::{ParsedLedger, StorageError, encode_ledger, parse_ledger};

/// What a cycle wants done with the ledger it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle<T> {
    /// Persist the mutated ledger, then return the value.
    Commit(T),
    /// Return the value without writing anything.
    Discard(T),
}

/// File-backed store for the account ledger.
///
/// All clones share one FIFO mutex, so every handler touching the same file
/// should hold a clone of the same store. Access from separate processes is
/// not coordinated.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LedgerStore {
    /// Bind a store to `path`. Nothing is touched on disk until the first load.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the next save is staged in.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("ledger"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Create the file with the seed accounts if it does not exist yet.
    /// Returns true when the file was created. Runs under the store lock.
    pub async fn ensure_exists(&self) -> Result<bool, StorageError> {
        self.run_locked(|store| async move { store.seed_if_missing().await })
            .await
    }

    /// Load the ledger, dropping malformed rows. Each dropped row is logged.
    pub async fn load(&self) -> Result<Ledger, StorageError> {
        self.run_locked(|store| async move { store.read_ledger().await })
            .await
    }

    /// Load the ledger and return the dropped rows alongside it.
    pub async fn load_with_diagnostics(&self) -> Result<ParsedLedger, StorageError> {
        self.run_locked(|store| async move { store.read_parsed().await })
            .await
    }

    /// Replace the file contents with `ledger`. Readers see either the old
    /// file or the new one, never a partial write.
    pub async fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let ledger = ledger.clone();
        self.run_locked(move |store| async move { store.write_ledger(&ledger).await })
            .await
    }

    /// Run one load-mutate-save cycle under exclusive access.
    ///
    /// `f` works on a private copy of the ledger. The copy is saved only when
    /// `f` returns `Cycle::Commit`; on an error or `Cycle::Discard` the file is
    /// left as it was. Waiters are served in arrival order.
    ///
    /// Once the lock is taken the cycle runs on its own task, so dropping the
    /// returned future does not release the lock before the save finishes.
    pub async fn with_exclusive_access<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Ledger) -> Result<Cycle<T>, E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        self.run_locked(move |store| async move {
            let mut ledger = store.read_ledger().await?;

            match f(&mut ledger)? {
                Cycle::Commit(value) => {
                    store.write_ledger(&ledger).await?;
                    Ok::<T, E>(value)
                }
                Cycle::Discard(value) => Ok(value),
            }
        })
        .await
    }

    /// Take the lock, then hand `job` and the guard to a spawned task. The
    /// guard is released only when `job` has finished.
    async fn run_locked<T, E, J, Fut>(&self, job: J) -> Result<T, E>
    where
        J: FnOnce(LedgerStore) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let guard = self.lock.clone().lock_owned().await;
        let job = job(self.clone());

        let handle = tokio::spawn(async move {
            let result = job.await;
            drop(guard);
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(StorageError::Interrupted {
                path: self.path.clone(),
            }
            .into()),
        }
    }

    // Everything below assumes the caller holds the lock.

    async fn seed_if_missing(&self) -> Result<bool, StorageError> {
        let exists = fs::try_exists(&self.path)
            .await
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?;
        if exists {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Create {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.write_atomic(&encode_ledger(&Ledger::seed())?).await?;
        tracing::info!(path = %self.path.display(), "created ledger with seed accounts");
        Ok(true)
    }

    async fn read_ledger(&self) -> Result<Ledger, StorageError> {
        let parsed = self.read_parsed().await?;
        for row in &parsed.rejected {
            tracing::warn!(
                path = %self.path.display(),
                line = row.line,
                field = row.field.as_deref().unwrap_or(""),
                "dropping malformed ledger row: {}",
                row.error
            );
        }
        Ok(parsed.ledger)
    }

    async fn read_parsed(&self) -> Result<ParsedLedger, StorageError> {
        self.seed_if_missing().await?;

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StorageError::Read {
                path: self.path.clone(),
                source,
            })?;

        let parsed = parse_ledger(&content);
        tracing::debug!(
            path = %self.path.display(),
            accounts = parsed.ledger.len(),
            rejected = parsed.rejected.len(),
            "ledger loaded"
        );
        Ok(parsed)
    }

    async fn write_ledger(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let bytes = encode_ledger(ledger)?;
        self.write_atomic(&bytes).await?;
        tracing::debug!(
            path = %self.path.display(),
            accounts = ledger.len(),
            "ledger saved"
        );
        Ok(())
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();

        if let Err(e) = write_synced(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| StorageError::Rename {
                path: self.path.clone(),
                source,
            })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|source| StorageError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    file.write_all(bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    file.sync_all()
        .await
        .map_err(|source| StorageError::Sync {
            path: path.to_path_buf(),
            source,
        })
}
