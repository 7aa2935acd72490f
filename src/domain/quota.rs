use chrono::{Local, NaiveDate};
use std::sync::Mutex;

use super::Account;

/// Source of "today" for the daily-reset policy.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The process's local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to. Used to simulate day rollover.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }

    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = today.checked_add_days(chrono::Days::new(days)) {
            *today = next;
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Apply the daily-reset policy in place.
///
/// If the account was last used on a day other than `today`, its counter is
/// treated as zero and the date moves to `today`. Returns true when the
/// account changed.
pub fn apply_daily_reset(account: &mut Account, today: NaiveDate) -> bool {
    if account.last_used_date == Some(today) {
        return false;
    }
    account.used_today = 0;
    account.last_used_date = Some(today);
    true
}

/// Copy of `account` as it looks on `today`, leaving the original untouched.
pub fn daily_view(account: &Account, today: NaiveDate) -> Account {
    let mut view = account.clone();
    apply_daily_reset(&mut view, today);
    view
}

/// Consume one unit of the daily quota.
///
/// The reset policy is applied first. On rejection the account is left as
/// the reset view and the caller must not persist it.
pub fn consume_one(account: &mut Account, today: NaiveDate) -> Result<(), QuotaExceeded> {
    apply_daily_reset(account, today);
    if account.used_today >= account.daily_limit {
        return Err(QuotaExceeded {
            daily_limit: account.daily_limit,
            used_today: account.used_today,
        });
    }
    account.used_today += 1;
    account.last_used_date = Some(today);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded {
    pub daily_limit: u32,
    pub used_today: u32,
}

impl std::fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "daily limit of {} reached ({} used today)",
            self.daily_limit, self.used_today
        )
    }
}

impl std::error::Error for QuotaExceeded {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_reset_on_new_day() {
        let mut account = Account::new("alice", "secret1");
        account.used_today = 7;
        account.last_used_date = Some(date("2024-03-01"));

        assert!(apply_daily_reset(&mut account, date("2024-03-02")));
        assert_eq!(account.used_today, 0);
        assert_eq!(account.last_used_date, Some(date("2024-03-02")));
    }

    #[test]
    fn test_no_reset_same_day() {
        let mut account = Account::new("alice", "secret1");
        account.used_today = 7;
        account.last_used_date = Some(date("2024-03-02"));

        assert!(!apply_daily_reset(&mut account, date("2024-03-02")));
        assert_eq!(account.used_today, 7);
    }

    #[test]
    fn test_never_used_counts_as_new_day() {
        let mut account = Account::new("alice", "secret1");
        assert!(apply_daily_reset(&mut account, date("2024-03-02")));
        assert_eq!(account.last_used_date, Some(date("2024-03-02")));
    }

    #[test]
    fn test_reset_applies_to_past_and_future_dates() {
        // Any date other than today resets, including a clock that went backwards
        let mut account = Account::new("alice", "secret1");
        account.used_today = 4;
        account.last_used_date = Some(date("2030-01-01"));
        apply_daily_reset(&mut account, date("2024-03-02"));
        assert_eq!(account.used_today, 0);
    }

    #[test]
    fn test_daily_view_does_not_touch_original() {
        let mut account = Account::new("alice", "secret1");
        account.used_today = 3;
        account.last_used_date = Some(date("2024-03-01"));

        let view = daily_view(&account, date("2024-03-05"));
        assert_eq!(view.used_today, 0);
        assert_eq!(account.used_today, 3);
        assert_eq!(account.last_used_date, Some(date("2024-03-01")));
    }

    #[test]
    fn test_consume_until_exhausted() {
        let today = date("2024-03-02");
        let mut account = Account::new("alice", "secret1").with_daily_limit(2);

        assert!(consume_one(&mut account, today).is_ok());
        assert!(consume_one(&mut account, today).is_ok());
        assert_eq!(account.used_today, 2);

        let err = consume_one(&mut account, today).unwrap_err();
        assert_eq!(
            err,
            QuotaExceeded {
                daily_limit: 2,
                used_today: 2
            }
        );
        assert_eq!(account.used_today, 2);
    }

    #[test]
    fn test_zero_limit_always_rejects() {
        let mut account = Account::new("alice", "secret1").with_daily_limit(0);
        assert!(consume_one(&mut account, date("2024-03-02")).is_err());
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(date("2024-02-28"));
        clock.advance_days(2);
        assert_eq!(clock.today(), date("2024-03-01"));
        clock.set(date("2025-01-01"));
        assert_eq!(clock.today(), date("2025-01-01"));
    }
}
