// User and session endpoints

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{ApiEnvelope, LoginRequest, RegisterReceipt, RegisterRequest, Session, User};

impl ApiClient {
    /// `POST /users/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterReceipt> {
        let envelope: ApiEnvelope<RegisterReceipt> =
            self.post_json("users/register", request).await?;
        Ok(envelope.data)
    }

    /// `POST /users/login`
    ///
    /// On success the returned access token replaces whatever the token
    /// store held; the refresh-token cookie is captured by the HTTP client.
    pub async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let envelope: ApiEnvelope<Session> = self.post_json("users/login", request).await?;
        self.tokens().set(&envelope.data.access_token).await;
        tracing::info!(email = %request.email, "Signed in");
        Ok(envelope.data)
    }

    /// `POST /users/logout`; the stored token is dropped afterwards
    pub async fn logout(&self) -> Result<()> {
        let builder = self.http_request(reqwest::Method::POST, "users/logout")?;
        let result = self.send_unit(builder).await;
        // The session is over either way.
        self.tokens().clear().await;
        result
    }

    /// `GET /users/profile` - returns the bare user object, not the envelope
    pub async fn profile(&self) -> Result<User> {
        self.get_json("users/profile").await
    }
}
