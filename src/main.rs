use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;

use finboard_client::api::DEFAULT_TRANSACTION_LIMIT;
use finboard_client::models::{LoginRequest, RegisterRequest};
use finboard_client::{ApiClient, Config, TokenStore};

/// Finboard - financial dashboard client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API base URL
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
    },
    /// Sign in and cache the access token
    Login {
        #[arg(long)]
        email: String,
    },
    /// Sign out and drop the cached token
    Logout,
    /// Show the signed-in user's profile
    Profile,
    /// Balance, expense and savings summary
    Summary,
    /// Capital-flow chart data for the last months
    WorkingCapital,
    /// Wallet cards
    Wallet,
    /// Recent transactions
    Transactions {
        #[arg(long, default_value_t = DEFAULT_TRANSACTION_LIMIT)]
        limit: u32,
    },
    /// Scheduled transfers
    Transfers,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap resolves env-backed arguments
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Let the flag win over the environment, the way Config reads it
    if let Some(ref base_url) = cli.base_url {
        std::env::set_var("API_BASE_URL", base_url);
    }
    std::env::set_var("LOG_LEVEL", &cli.log_level);

    let config = Config::load()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let tokens = Arc::new(match config.token_cache_file.clone() {
        Some(path) => TokenStore::with_cache_file(path),
        None => TokenStore::in_memory(),
    });
    let client = ApiClient::new(&config, Arc::clone(&tokens))?;

    match cli.command {
        Command::Register { full_name, email } => {
            let password = prompt_password("Choose a password")?;
            let receipt = client
                .register(&RegisterRequest {
                    full_name,
                    email,
                    password,
                })
                .await?;
            println!("Registered {} <{}> (id {})", receipt.full_name, receipt.email, receipt.id);
        }

        Command::Login { email } => {
            let password = prompt_password("Password")?;
            let session = client.login(&LoginRequest { email, password }).await?;
            println!("Signed in as {} <{}>", session.user.full_name, session.user.email);
        }

        Command::Logout => {
            client.logout().await?;
            println!("Signed out");
        }

        Command::Profile => {
            let user = client.profile().await?;
            println!("{} <{}>", user.full_name, user.email);
            println!("role: {}, active: {}", user.role, user.is_active);
            if let Some(last) = user.last_login_at {
                println!("last login: {}", last.to_rfc3339());
            }
        }

        Command::Summary => {
            let summary = client.financial_summary().await?;
            print_money("balance", &summary.total_balance);
            print_money("expense", &summary.total_expense);
            print_money("savings", &summary.total_savings);
        }

        Command::WorkingCapital => {
            let capital = client.working_capital().await?;
            println!("period: {} ({})", capital.period, capital.currency);
            for point in &capital.data {
                println!(
                    "  {:<12} income {:>12.2}  expense {:>12.2}  net {:>12.2}",
                    point.month, point.income, point.expense, point.net
                );
            }
            println!(
                "total income {:.2}, total expense {:.2}, net {:.2}",
                capital.summary.total_income,
                capital.summary.total_expense,
                capital.summary.net_balance
            );
        }

        Command::Wallet => {
            let cards = client.wallet_cards().await?;
            for card in &cards {
                println!(
                    "{} {} ({}, {}) {} {:02}/{}{}",
                    card.bank,
                    card.name,
                    card.kind,
                    card.network,
                    card.card_number,
                    card.expiry_month,
                    card.expiry_year,
                    if card.is_default.unwrap_or(false) {
                        " [default]"
                    } else {
                        ""
                    }
                );
            }
        }

        Command::Transactions { limit } => {
            let transactions = client.recent_transactions(limit).await?;
            for tx in &transactions {
                println!(
                    "{}  {:<24} {:<20} {:>12.2} {}  {}",
                    tx.date.format("%Y-%m-%d"),
                    tx.name,
                    tx.business,
                    tx.amount,
                    tx.currency,
                    tx.status
                );
            }
        }

        Command::Transfers => {
            let transfers = client.scheduled_transfers().await?;
            for t in &transfers.transfers {
                println!(
                    "{}  {:<24} {:>12.2} {}  {}",
                    t.date.format("%Y-%m-%d"),
                    t.name,
                    t.amount,
                    t.currency,
                    t.status
                );
            }
            if let Some(summary) = transfers.summary {
                println!(
                    "{} transfers scheduled, {:.2} total",
                    summary.count, summary.total_scheduled_amount
                );
            }
        }
    }

    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    let password = Password::new()
        .with_prompt(prompt)
        .interact()
        .context("Failed to read password")?;

    if password.is_empty() {
        anyhow::bail!("password cannot be empty");
    }
    Ok(password)
}

fn print_money(label: &str, money: &finboard_client::models::MoneySummary) {
    match &money.change {
        Some(change) => println!(
            "{:<8} {:>14.2} {}  ({:+.1}% {})",
            label, money.amount, money.currency, change.percentage, change.trend
        ),
        None => println!("{:<8} {:>14.2} {}", label, money.amount, money.currency),
    }
}
