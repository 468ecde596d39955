//! Service configuration.
//!
//! The original deployment buried the fine rate and mail sender in global
//! settings; here they are explicit and handed to the ledger and the
//! dispatcher at construction.

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Mail API endpoint. `None` disables delivery (sends are logged and
    /// dropped).
    pub api_url: Option<String>,

    /// Sender address placed on every outgoing message.
    pub sender: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            sender: "library@localhost".to_string(),
        }
    }
}

/// Configuration for the circulation service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database path or `sqlite::memory:`.
    pub database_url: String,

    /// Fine charged per day overdue, in whole currency units.
    pub fine_rate_per_day: i64,

    /// Loan period applied when a borrow request carries no due date.
    pub loan_period_days: i64,

    /// Bearer token lifetime in hours.
    pub token_ttl_hours: i64,

    /// Outbound mail settings.
    pub mail: MailConfig,
}

impl AppConfig {
    /// Create a config for the given database.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Set the per-day fine rate.
    pub fn with_fine_rate(mut self, rate: i64) -> Self {
        self.fine_rate_per_day = rate;
        self
    }

    /// Set the default loan period.
    pub fn with_loan_period(mut self, days: i64) -> Self {
        self.loan_period_days = days;
        self
    }

    /// Set mail settings.
    pub fn with_mail(mut self, mail: MailConfig) -> Self {
        self.mail = mail;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:circdesk.db".to_string(),
            fine_rate_per_day: 10,
            loan_period_days: 14,
            token_ttl_hours: 24,
            mail: MailConfig::default(),
        }
    }
}
