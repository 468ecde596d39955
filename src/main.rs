//! circdesk - library circulation backend.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circdesk::{
    api::{self, ApiState},
    notify, AppConfig, MailConfig, Store,
};

/// Library circulation backend.
#[derive(Parser)]
#[command(name = "circdesk", about = "Library circulation backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API daemon.
    Daemon {
        /// Address to bind the API server.
        #[arg(long, default_value = "0.0.0.0:7474", env = "CIRCDESK_BIND")]
        bind: String,

        /// SQLite database URL.
        #[arg(long, default_value = "sqlite:circdesk.db", env = "CIRCDESK_DB")]
        database_url: String,

        /// Fine charged per day overdue, in whole currency units.
        #[arg(long, default_value_t = 10, env = "CIRCDESK_FINE_RATE")]
        fine_rate: i64,

        /// Default loan period in days.
        #[arg(long, default_value_t = 14, env = "CIRCDESK_LOAN_DAYS")]
        loan_days: i64,

        /// HTTP mail API endpoint. Omit to disable delivery.
        #[arg(long, env = "CIRCDESK_MAIL_API_URL")]
        mail_api_url: Option<String>,

        /// Sender address for outgoing mail.
        #[arg(long, default_value = "library@localhost", env = "CIRCDESK_MAIL_SENDER")]
        mail_sender: String,
    },

    /// Show service status.
    Status {
        /// circdesk API URL.
        #[arg(long, env = "CIRCDESK_API_URL", default_value = "http://localhost:7474")]
        api_url: String,
    },

    /// Trigger the due-notification sweep (admin token required).
    Sweep {
        /// Admin bearer token.
        #[arg(long, env = "CIRCDESK_TOKEN")]
        token: String,

        /// circdesk API URL.
        #[arg(long, env = "CIRCDESK_API_URL", default_value = "http://localhost:7474")]
        api_url: String,
    },

    /// List outstanding fines (admin token required).
    Fines {
        /// Admin bearer token.
        #[arg(long, env = "CIRCDESK_TOKEN")]
        token: String,

        /// circdesk API URL.
        #[arg(long, env = "CIRCDESK_API_URL", default_value = "http://localhost:7474")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circdesk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            bind,
            database_url,
            fine_rate,
            loan_days,
            mail_api_url,
            mail_sender,
        } => {
            let config = AppConfig::new(database_url)
                .with_fine_rate(fine_rate)
                .with_loan_period(loan_days)
                .with_mail(MailConfig {
                    api_url: mail_api_url,
                    sender: mail_sender,
                });
            run_daemon(&bind, config).await?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }

        Commands::Sweep { token, api_url } => {
            run_sweep(&api_url, &token).await?;
        }

        Commands::Fines { token, api_url } => {
            list_fines(&api_url, &token).await?;
        }
    }

    Ok(())
}

/// Run the API daemon.
async fn run_daemon(bind: &str, config: AppConfig) -> Result<()> {
    tracing::info!("Starting circdesk daemon...");

    let store = Store::connect(&config.database_url).await?;
    tracing::info!(database = %config.database_url, "store ready");

    let mailer = notify::from_config(&config.mail);
    if config.mail.api_url.is_none() {
        tracing::warn!("no mail API configured, notifications will be dropped");
    }

    let state = Arc::new(ApiState::new(store, mailer, config));
    api::serve(state, bind).await?;

    Ok(())
}

/// Show service status via API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/status", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("circdesk Status");
    println!("===============");
    println!("Status:         {}", status["status"]);
    println!("Books:          {}", status["books"]);
    println!("Open records:   {}", status["open_records"]);
    println!("Due or overdue: {}", status["due_or_overdue"]);

    Ok(())
}

/// Trigger the due-notification sweep via API.
async fn run_sweep(api_url: &str, token: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/borrow-records/check_due_books", api_url);

    let response = client.get(&url).bearer_auth(token).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Sweep failed: {}", error_text);
    }

    let body: serde_json::Value = response.json().await?;
    println!("{}", body["message"].as_str().unwrap_or("done"));

    Ok(())
}

/// List outstanding fines via API.
async fn list_fines(api_url: &str, token: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/borrow-records/unpaid_fines", api_url);

    let response = client.get(&url).bearer_auth(token).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Failed to list fines: {}", error_text);
    }

    let fines: Vec<serde_json::Value> = response.json().await?;

    if fines.is_empty() {
        println!("No outstanding fines.");
        return Ok(());
    }

    println!("{:<8} {:<8} {:<8} {:<12} {:<12}", "RECORD", "USER", "BOOK", "DUE", "FINE");
    println!("{}", "-".repeat(52));

    for fine in fines {
        println!(
            "{:<8} {:<8} {:<8} {:<12} {:<12}",
            fine["id"],
            fine["user_id"],
            fine["book_id"],
            fine["due_date"].as_str().unwrap_or("?").get(..10).unwrap_or("?"),
            fine["fine_amount"]
        );
    }

    Ok(())
}
