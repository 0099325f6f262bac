// Read-only financial dashboard endpoints

use reqwest::Method;

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{
    ApiEnvelope, FinancialSummary, ScheduledTransfers, Transaction, TransactionsData, WalletCard,
    WalletData, WorkingCapital,
};

/// Default number of transactions fetched by the dashboard list
pub const DEFAULT_TRANSACTION_LIMIT: u32 = 20;

impl ApiClient {
    /// `GET /financial/summary`
    pub async fn financial_summary(&self) -> Result<FinancialSummary> {
        let envelope: ApiEnvelope<FinancialSummary> =
            self.get_json("financial/summary").await?;
        Ok(envelope.data)
    }

    /// `GET /financial/working-capital`
    pub async fn working_capital(&self) -> Result<WorkingCapital> {
        let envelope: ApiEnvelope<WorkingCapital> =
            self.get_json("financial/working-capital").await?;
        Ok(envelope.data)
    }

    /// `GET /financial/wallet`
    pub async fn wallet_cards(&self) -> Result<Vec<WalletCard>> {
        let envelope: ApiEnvelope<WalletData> = self.get_json("financial/wallet").await?;
        Ok(envelope.data.cards)
    }

    /// `GET /financial/transactions/recent?limit=N`
    pub async fn recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>> {
        let builder = self
            .http_request(Method::GET, "financial/transactions/recent")?
            .query(&[("limit", limit)]);
        let envelope: ApiEnvelope<TransactionsData> = self.send_json(builder).await?;
        Ok(envelope.data.transactions)
    }

    /// `GET /financial/transfers/scheduled`
    pub async fn scheduled_transfers(&self) -> Result<ScheduledTransfers> {
        let envelope: ApiEnvelope<ScheduledTransfers> =
            self.get_json("financial/transfers/scheduled").await?;
        Ok(envelope.data)
    }
}
