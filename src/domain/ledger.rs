use super::{Account, Role};

/// The full, ordered set of accounts. Row order is insertion order and is
/// kept across save cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    accounts: Vec<Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two accounts written when a ledger file is first created.
    pub fn seed() -> Self {
        Self {
            accounts: vec![
                Account::new("admin", "admin123")
                    .with_role(Role::Admin)
                    .with_daily_limit(999),
                Account::new("user", "password"),
            ],
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.position(username).is_some()
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.username == username)
    }

    /// First account whose username and password both match exactly.
    pub fn find_by_credentials(&self, username: &str, password: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.matches_credentials(username, password))
    }

    /// Append an account. Returns it back if the username is already taken.
    pub fn insert(&mut self, account: Account) -> Result<(), Account> {
        if self.contains(&account.username) {
            return Err(account);
        }
        self.accounts.push(account);
        Ok(())
    }

    /// Remove an account by username, keeping the order of the others.
    pub fn remove(&mut self, username: &str) -> Option<Account> {
        let index = self.position(username)?;
        Some(self.accounts.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    fn position(&self, username: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.username == username)
    }
}

impl From<Vec<Account>> for Ledger {
    fn from(accounts: Vec<Account>) -> Self {
        let mut ledger = Ledger::new();
        for account in accounts {
            // Keep the first occurrence of a duplicated username
            let _ = ledger.insert(account);
        }
        ledger
    }
}

impl IntoIterator for Ledger {
    type Item = Account;
    type IntoIter = std::vec::IntoIter<Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.into_iter()
    }
}
