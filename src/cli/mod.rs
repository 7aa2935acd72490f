use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};

use crate::application::{AccountService, AppError};
use crate::io::Exporter;
use crate::storage::DEFAULT_LEDGER_PATH;

/// Tally - account ledger with daily usage quotas
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "A file-backed account ledger that enforces per-day usage quotas")]
#[command(version)]
pub struct Cli {
    /// Ledger file path
    #[arg(short, long, env = "TALLY_LEDGER", default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger file with the seed accounts
    Init,

    /// Check credentials and show today's quota
    Login {
        username: String,
        password: String,
    },

    /// Register a new account
    Register {
        /// Letters, digits and underscores, at least 3 characters
        username: String,

        /// At least 6 characters
        password: String,
    },

    /// Consume one unit of an account's daily quota
    Use { username: String },

    /// List all accounts (admin)
    Users {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Change an account's daily limit (admin)
    SetLimit {
        username: String,

        /// New daily limit
        #[arg(allow_negative_numbers = true)]
        limit: i64,
    },

    /// Zero an account's usage for today (admin)
    ResetUsage { username: String },

    /// Delete a regular account (admin)
    Delete { username: String },

    /// Verify the ledger file and report dropped rows
    Check,

    /// Export the account listing to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let service = AccountService::open(&self.ledger)
            .await
            .with_context(|| format!("Failed to open ledger '{}'", self.ledger))?;

        match self.command {
            Commands::Init => {
                println!("Ledger ready: {}", service.store().path().display());
            }

            Commands::Login { username, password } => {
                let login = service.login(&username, &password).await?;
                println!("Logged in as {} ({})", login.username, login.role);
                println!(
                    "  Used today: {} / {} ({} remaining)",
                    login.used_today, login.daily_limit, login.remaining_today
                );
            }

            Commands::Register { username, password } => {
                let account = service.register(&username, &password).await?;
                println!(
                    "Registered account: {} (daily limit {})",
                    account.username, account.daily_limit
                );
            }

            Commands::Use { username } => match service.increment_usage(&username).await {
                Ok(usage) => {
                    println!(
                        "Recorded usage for {}: {} / {} ({} remaining)",
                        username, usage.used_today, usage.daily_limit, usage.remaining_today
                    );
                }
                Err(AppError::QuotaExceeded {
                    daily_limit,
                    used_today,
                    ..
                }) => {
                    anyhow::bail!(
                        "Daily limit reached for {}: {} / {} (0 remaining)",
                        username,
                        used_today,
                        daily_limit
                    );
                }
                Err(e) => return Err(e.into()),
            },

            Commands::Users { json } => run_users_command(&service, json).await?,

            Commands::SetLimit { username, limit } => {
                let account = service.update_limit(&username, limit).await?;
                println!(
                    "Updated daily limit: {} -> {}",
                    account.username, account.daily_limit
                );
            }

            Commands::ResetUsage { username } => {
                let account = service.reset_usage(&username).await?;
                println!(
                    "Reset usage for {} ({} remaining)",
                    account.username,
                    account.remaining_today()
                );
            }

            Commands::Delete { username } => {
                service.delete_account(&username).await?;
                println!("Deleted account: {}", username);
            }

            Commands::Check => run_check_command(&service).await?,

            Commands::Export { output, format } => {
                run_export_command(&service, output, &format).await?
            }
        }

        Ok(())
    }
}

async fn run_users_command(service: &AccountService, json: bool) -> Result<()> {
    let accounts = service.list_accounts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!(
        "{:<20} {:<6} {:>8} {:>8} {:<12}",
        "USERNAME", "ROLE", "LIMIT", "USED", "LAST USED"
    );
    println!("{}", "-".repeat(58));
    for account in accounts {
        println!(
            "{:<20} {:<6} {:>8} {:>8} {:<12}",
            account.username,
            account.role,
            account.daily_limit,
            account.used_today,
            account
                .last_used_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

async fn run_check_command(service: &AccountService) -> Result<()> {
    println!("Checking ledger...\n");

    let report = service.check_ledger().await?;

    println!("File:     {}", report.path.display());
    println!("Accounts: {}", report.account_count);
    println!("Admins:   {}", report.admin_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
        return Ok(());
    }

    println!("Issues found:");
    if report.admin_count == 0 {
        println!("  - no admin account");
    }
    for row in &report.rejected {
        println!("  - {} (dropped)", row);
    }
    anyhow::bail!("Ledger check failed")
}

async fn run_export_command(
    service: &AccountService,
    output: Option<String>,
    format: &str,
) -> Result<()> {
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create '{}'", path))?,
        ),
        None => Box::new(io::stdout()),
    };

    let exporter = Exporter::new(service);
    let count = match format {
        "csv" => exporter.export_accounts_csv(writer).await?,
        "json" => exporter.export_accounts_json(writer).await?.accounts.len(),
        other => anyhow::bail!("Unknown format '{}'. Use csv or json", other),
    };

    if let Some(path) = output {
        eprintln!("Exported {} account(s) to {}", count, path);
    }
    Ok(())
}
