use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{
    Account, Clock, Role, SystemClock, consume_one, daily_view, validate_password,
    validate_username,
};
use crate::storage::{Cycle, LedgerStore, RowError};

use super::AppError;

/// Application service providing the account operations.
/// This is the primary interface for any client (CLI, HTTP handlers, etc.).
///
/// Every operation is one exclusive-access cycle on the store, so concurrent
/// calls are applied one after another in arrival order.
#[derive(Clone)]
pub struct AccountService {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
}

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub role: Role,
    pub daily_limit: u32,
    pub used_today: u32,
    pub remaining_today: u32,
}

/// Counters after a successful usage increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageResult {
    pub daily_limit: u32,
    pub used_today: u32,
    pub remaining_today: u32,
}

/// Account as shown to administrators. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub username: String,
    pub role: Role,
    pub daily_limit: u32,
    pub used_today: u32,
    pub last_used_date: Option<NaiveDate>,
}

/// Health of the ledger file
#[derive(Debug, Clone)]
pub struct LedgerReport {
    pub path: PathBuf,
    pub account_count: usize,
    pub admin_count: usize,
    pub rejected: Vec<RowError>,
}

impl LedgerReport {
    pub fn is_healthy(&self) -> bool {
        self.rejected.is_empty() && self.admin_count > 0
    }
}

impl From<&Account> for LoginResponse {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            role: account.role,
            daily_limit: account.daily_limit,
            used_today: account.used_today,
            remaining_today: account.remaining_today(),
        }
    }
}

impl From<&Account> for UsageResult {
    fn from(account: &Account) -> Self {
        Self {
            daily_limit: account.daily_limit,
            used_today: account.used_today,
            remaining_today: account.remaining_today(),
        }
    }
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            role: account.role,
            daily_limit: account.daily_limit,
            used_today: account.used_today,
            last_used_date: account.last_used_date,
        }
    }
}

impl AccountService {
    /// Create a service over `store` using the local calendar date.
    pub fn new(store: LedgerStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Open the ledger file at `path` (created with seed accounts on first use).
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = LedgerStore::open(path.as_ref());
        store.ensure_exists().await?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ========================
    // User operations
    // ========================

    /// Check credentials and return the account as it looks today.
    ///
    /// The daily reset is applied to the returned copy only; it reaches the
    /// file the next time a mutating operation touches the account.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Account, AppError> {
        let clock = Arc::clone(&self.clock);
        let username = username.to_string();
        let password = password.to_string();

        self.store
            .with_exclusive_access(move |ledger| {
                let account = ledger
                    .find_by_credentials(&username, &password)
                    .ok_or(AppError::InvalidCredentials)?;
                Ok(Cycle::Discard(daily_view(account, clock.today())))
            })
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let account = self.authenticate(username, password).await?;
        Ok(LoginResponse::from(&account))
    }

    /// Register a new regular account with the default quota.
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AppError> {
        validate_username(username).map_err(AppError::InvalidUsername)?;
        validate_password(password).map_err(AppError::WeakPassword)?;

        let account = Account::new(username, password);
        let account = self
            .store
            .with_exclusive_access(move |ledger| {
                ledger
                    .insert(account.clone())
                    .map_err(|dup| AppError::UsernameTaken(dup.username))?;
                Ok::<_, AppError>(Cycle::Commit(account))
            })
            .await?;

        tracing::info!(username, "account registered");
        Ok(account)
    }

    /// Consume one unit of the account's daily quota.
    pub async fn increment_usage(&self, username: &str) -> Result<UsageResult, AppError> {
        let clock = Arc::clone(&self.clock);
        let username = username.to_string();

        self.store
            .with_exclusive_access(move |ledger| {
                let account = ledger
                    .get_mut(&username)
                    .ok_or_else(|| AppError::AccountNotFound(username.clone()))?;

                if let Err(exceeded) = consume_one(account, clock.today()) {
                    tracing::warn!(
                        username = %username,
                        daily_limit = exceeded.daily_limit,
                        "daily quota exhausted"
                    );
                    return Err(AppError::QuotaExceeded {
                        username,
                        daily_limit: exceeded.daily_limit,
                        used_today: exceeded.used_today,
                    });
                }

                Ok(Cycle::Commit(UsageResult::from(&*account)))
            })
            .await
    }

    // ========================
    // Admin operations
    // ========================

    /// List every account with today's counters. Passwords are left out.
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>, AppError> {
        let clock = Arc::clone(&self.clock);

        self.store
            .with_exclusive_access(move |ledger| {
                let today = clock.today();
                let summaries = ledger
                    .iter()
                    .map(|account| AccountSummary::from(&daily_view(account, today)))
                    .collect::<Vec<_>>();
                Ok(Cycle::Discard(summaries))
            })
            .await
    }

    /// Zero today's usage for an account.
    pub async fn reset_usage(&self, username: &str) -> Result<Account, AppError> {
        let clock = Arc::clone(&self.clock);
        let name = username.to_string();

        let account = self
            .store
            .with_exclusive_access(move |ledger| {
                let account = ledger
                    .get_mut(&name)
                    .ok_or_else(|| AppError::AccountNotFound(name.clone()))?;
                account.used_today = 0;
                account.last_used_date = Some(clock.today());
                Ok::<_, AppError>(Cycle::Commit(account.clone()))
            })
            .await?;

        tracing::info!(username, "daily usage reset");
        Ok(account)
    }

    /// Change an account's daily limit. Usage counters are left alone.
    pub async fn update_limit(&self, username: &str, new_limit: i64) -> Result<Account, AppError> {
        let limit = u32::try_from(new_limit).map_err(|_| AppError::InvalidLimit(new_limit))?;
        let name = username.to_string();

        let account = self
            .store
            .with_exclusive_access(move |ledger| {
                let account = ledger
                    .get_mut(&name)
                    .ok_or_else(|| AppError::AccountNotFound(name.clone()))?;
                account.daily_limit = limit;
                Ok::<_, AppError>(Cycle::Commit(account.clone()))
            })
            .await?;

        tracing::info!(username, daily_limit = limit, "daily limit updated");
        Ok(account)
    }

    /// Delete a regular account. Admin accounts are refused.
    pub async fn delete_account(&self, username: &str) -> Result<(), AppError> {
        let name = username.to_string();

        self.store
            .with_exclusive_access(move |ledger| {
                let account = ledger
                    .get(&name)
                    .ok_or_else(|| AppError::AccountNotFound(name.clone()))?;
                if account.is_admin() {
                    return Err(AppError::ForbiddenDelete(name));
                }
                ledger.remove(&name);
                Ok::<_, AppError>(Cycle::Commit(()))
            })
            .await?;

        tracing::info!(username, "account deleted");
        Ok(())
    }

    /// Inspect the ledger file, including any rows the parser had to drop.
    pub async fn check_ledger(&self) -> Result<LedgerReport, AppError> {
        let parsed = self.store.load_with_diagnostics().await?;

        Ok(LedgerReport {
            path: self.store.path().to_path_buf(),
            account_count: parsed.ledger.len(),
            admin_count: parsed.ledger.iter().filter(|a| a.is_admin()).count(),
            rejected: parsed.rejected,
        })
    }
}
