use chrono::NaiveDate;

use crate::domain::{Account, DEFAULT_DAILY_LIMIT, Ledger, Role};

/// Schema marker written as the first line of every ledger file.
pub const HEADER: [&str; 6] = [
    "username",
    "password",
    "role",
    "daily_limit",
    "used_today",
    "last_used_date",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A row that could not be turned into an account and was left out of the
/// parsed ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
    pub raw: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "line {} ({}): {}", self.line, field, self.error),
            None => write!(f, "line {}: {}", self.line, self.error),
        }
    }
}

/// Result of a tolerant parse: every usable account plus the rows that were
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedLedger {
    pub ledger: Ledger,
    pub rejected: Vec<RowError>,
}

impl ParsedLedger {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse ledger text. The first line is always treated as the header.
///
/// Malformed rows never fail the whole parse; they are collected in
/// `rejected` instead. Missing trailing fields fall back to the registration
/// defaults.
pub fn parse_ledger(content: &str) -> ParsedLedger {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut parsed = ParsedLedger::default();

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index + 2; // +2 for header and 0-indexing

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                parsed.rejected.push(RowError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                    raw: String::new(),
                });
                continue;
            }
        };

        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);
        let raw = record.iter().collect::<Vec<_>>().join(",");

        let account = match parse_record(&record) {
            Ok(account) => account,
            Err((field, error)) => {
                parsed.rejected.push(RowError {
                    line,
                    field: Some(field.to_string()),
                    error,
                    raw,
                });
                continue;
            }
        };

        if let Err(dup) = parsed.ledger.insert(account) {
            parsed.rejected.push(RowError {
                line,
                field: Some("username".to_string()),
                error: format!("duplicate username '{}'", dup.username),
                raw,
            });
        }
    }

    parsed
}

fn parse_record(record: &csv::StringRecord) -> Result<Account, (&'static str, String)> {
    let field = move |i: usize| record.get(i).unwrap_or("");

    let username = field(0);
    if username.is_empty() {
        return Err(("username", "missing username".to_string()));
    }
    let password = field(1);
    if password.is_empty() {
        return Err(("password", "missing password".to_string()));
    }

    let role = match field(2) {
        "" => Role::User,
        s => Role::from_str(s).ok_or(("role", format!("unknown role '{}'", s)))?,
    };
    let daily_limit = parse_count(field(3), DEFAULT_DAILY_LIMIT).map_err(|e| ("daily_limit", e))?;
    let used_today = parse_count(field(4), 0).map_err(|e| ("used_today", e))?;
    let last_used_date = match field(5) {
        "" => None,
        s => Some(
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|_| ("last_used_date", format!("invalid date '{}'", s)))?,
        ),
    };

    Ok(Account {
        username: username.to_string(),
        password: password.to_string(),
        role,
        daily_limit,
        used_today,
        last_used_date,
    })
}

fn parse_count(s: &str, default: u32) -> Result<u32, String> {
    if s.is_empty() {
        return Ok(default);
    }
    s.parse::<u32>()
        .map_err(|_| format!("'{}' is not a non-negative integer", s))
}

/// Serialize the full ledger, header first, one record per account.
pub fn encode_ledger(ledger: &Ledger) -> csv::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for account in ledger.iter() {
        writer.write_record([
            account.username.clone(),
            account.password.clone(),
            account.role.as_str().to_string(),
            account.daily_limit.to_string(),
            account.used_today.to_string(),
            account
                .last_used_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "username,password,role,daily_limit,used_today,last_used_date\nadmin,admin123,admin,999,0,\nuser,password,user,10,0,\n";

    #[test]
    fn test_encode_seed_matches_file_format() {
        let bytes = encode_ledger(&Ledger::seed()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), SEED);
    }

    #[test]
    fn test_parse_seed() {
        let parsed = parse_ledger(SEED);
        assert!(parsed.is_clean());
        assert_eq!(parsed.ledger, Ledger::seed());
    }

    #[test]
    fn test_parse_with_date_and_whitespace() {
        let parsed = parse_ledger(
            "username,password,role,daily_limit,used_today,last_used_date\n alice , secret1 ,user, 5 ,3, 2024-03-01 \n",
        );
        assert!(parsed.is_clean());
        let alice = parsed.ledger.get("alice").unwrap();
        assert_eq!(alice.password, "secret1");
        assert_eq!(alice.daily_limit, 5);
        assert_eq!(alice.used_today, 3);
        assert_eq!(
            alice.last_used_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_missing_trailing_fields_use_defaults() {
        let parsed = parse_ledger("username,password,role,daily_limit,used_today,last_used_date\nbob,hunter22\n");
        assert!(parsed.is_clean());
        let bob = parsed.ledger.get("bob").unwrap();
        assert_eq!(bob.role, Role::User);
        assert_eq!(bob.daily_limit, DEFAULT_DAILY_LIMIT);
        assert_eq!(bob.used_today, 0);
        assert_eq!(bob.last_used_date, None);
    }

    #[test]
    fn test_malformed_rows_are_reported_not_fatal() {
        let content = "username,password,role,daily_limit,used_today,last_used_date\n\
                       admin,admin123,admin,999,0,\n\
                       ,nopass,user,10,0,\n\
                       nopw,,user,10,0,\n\
                       carol,secret1,root,10,0,\n\
                       dave,secret1,user,-1,0,\n\
                       erin,secret1,user,10,lots,\n\
                       frank,secret1,user,10,0,yesterday\n\
                       admin,other99,user,10,0,\n\
                       user,password,user,10,0,\n";
        let parsed = parse_ledger(content);

        let names: Vec<_> = parsed.ledger.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["admin", "user"]);

        let fields: Vec<_> = parsed
            .rejected
            .iter()
            .map(|r| r.field.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(
            fields,
            vec![
                "username",
                "password",
                "role",
                "daily_limit",
                "used_today",
                "last_used_date",
                "username"
            ]
        );

        assert_eq!(parsed.rejected[0].line, 3);
        assert_eq!(parsed.rejected[6].line, 9);
        assert_eq!(parsed.rejected[6].raw, "admin,other99,user,10,0,");
    }

    #[test]
    fn test_header_only_and_blank_lines() {
        let parsed = parse_ledger("username,password,role,daily_limit,used_today,last_used_date\n\n\n");
        assert!(parsed.is_clean());
        assert!(parsed.ledger.is_empty());

        let parsed = parse_ledger("");
        assert!(parsed.ledger.is_empty());
    }

    #[test]
    fn test_password_with_comma_is_quoted() {
        let mut ledger = Ledger::new();
        ledger
            .insert(Account::new("alice", "pa,ss\"word"))
            .unwrap();

        let text = String::from_utf8(encode_ledger(&ledger).unwrap()).unwrap();
        assert!(text.contains("\"pa,ss\"\"word\""));

        let parsed = parse_ledger(&text);
        assert!(parsed.is_clean());
        assert_eq!(parsed.ledger.get("alice").unwrap().password, "pa,ss\"word");
    }

    #[test]
    fn test_row_order_preserved() {
        let content = "username,password,role,daily_limit,used_today,last_used_date\n\
                       zed,secret1,user,10,0,\n\
                       amy,secret1,user,10,0,\n\
                       mia,secret1,user,10,0,\n";
        let parsed = parse_ledger(content);
        let reencoded = String::from_utf8(encode_ledger(&parsed.ledger).unwrap()).unwrap();
        assert_eq!(reencoded, content);
    }
}
