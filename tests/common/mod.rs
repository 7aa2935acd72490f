// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tally::application::AccountService;
use tally::domain::ManualClock;
use tally::storage::{HEADER, LedgerStore};
use tempfile::TempDir;

/// Helper to create a test service over a temporary ledger file
pub async fn test_service() -> Result<(AccountService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("users.csv");
    let service = AccountService::open(&path).await?;
    Ok((service, temp_dir))
}

/// Helper to create a test service whose calendar only moves when told to
pub async fn test_service_at(
    date: &str,
) -> Result<(AccountService, Arc<ManualClock>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let clock = Arc::new(ManualClock::new(parse_date(date)));
    let store = LedgerStore::open(temp_dir.path().join("users.csv"));
    store.ensure_exists().await?;
    let service = AccountService::with_clock(store, clock.clone());
    Ok((service, clock, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Write a ledger file by hand: header plus the given rows
pub fn write_ledger(temp_dir: &TempDir, rows: &[&str]) -> PathBuf {
    let path = temp_dir.path().join("users.csv");
    let mut content = HEADER.join(",");
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    std::fs::write(&path, content).unwrap();
    path
}

/// Raw file contents of the service's ledger
pub fn ledger_text(service: &AccountService) -> String {
    std::fs::read_to_string(service.store().path()).unwrap()
}

/// Test fixture: regular accounts on top of the seed
pub struct StandardAccounts;

impl StandardAccounts {
    /// Register alice and bob with default quotas
    pub async fn create_basic(service: &AccountService) -> Result<()> {
        service.register("alice", "secret1").await?;
        service.register("bob", "hunter22").await?;
        Ok(())
    }
}
