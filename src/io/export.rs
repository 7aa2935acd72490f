use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::{AccountService, AccountSummary};

/// Account listing snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<AccountSummary>,
}

/// Exporter for the admin account listing. Passwords are never written.
pub struct Exporter<'a> {
    service: &'a AccountService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a AccountService) -> Self {
        Self { service }
    }

    /// Export accounts to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "username",
            "role",
            "daily_limit",
            "used_today",
            "remaining_today",
            "last_used_date",
        ])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.username.as_str(),
                account.role.as_str(),
                &account.daily_limit.to_string(),
                &account.used_today.to_string(),
                &account
                    .daily_limit
                    .saturating_sub(account.used_today)
                    .to_string(),
                &account
                    .last_used_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export accounts as a JSON snapshot
    pub async fn export_accounts_json<W: Write>(&self, mut writer: W) -> Result<AccountSnapshot> {
        let accounts = self.service.list_accounts().await?;

        let snapshot = AccountSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
