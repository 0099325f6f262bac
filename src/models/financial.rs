// Financial dashboard types

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountChange {
    pub percentage: f64,
    pub trend: Trend,
}

/// An amount with its currency and an optional period-over-period change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneySummary {
    pub amount: f64,
    pub currency: String,
    pub change: Option<AmountChange>,
}

/// `GET /financial/summary` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub total_balance: MoneySummary,
    pub total_expense: MoneySummary,
    pub total_savings: MoneySummary,
}

/// One month of the capital-flow chart
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCapitalPoint {
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCapitalTotals {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_balance: f64,
}

/// `GET /financial/working-capital` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCapital {
    pub period: String,
    pub currency: String,
    pub data: Vec<WorkingCapitalPoint>,
    pub summary: WorkingCapitalTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Credit,
    Debit,
}

impl std::fmt::Display for CardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardKind::Credit => write!(f, "credit"),
            CardKind::Debit => write!(f, "debit"),
        }
    }
}

/// A card in the wallet widget; the number may arrive masked
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCard {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub card_number: String,
    pub bank: String,
    pub network: String,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub color: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    pub cards: Vec<WalletCard>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub name: String,
    pub business: String,
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub currency: String,
    pub date: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsData {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTransfer {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTotals {
    pub total_scheduled_amount: f64,
    pub count: u64,
}

/// `GET /financial/transfers/scheduled` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTransfers {
    pub transfers: Vec<ScheduledTransfer>,
    pub summary: Option<TransferTotals>,
}
