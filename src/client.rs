// Authenticated HTTP client for the Finboard backend
// Attaches the bearer token to every request and transparently recovers
// from token expiry: one coalesced refresh, one resend, never more.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::RefreshResponse;
use crate::single_flight::SingleFlight;
use crate::token_store::TokenStore;

/// Authenticated API client.
///
/// The refresh-token session cookie set by the backend at login is held in
/// the client's cookie store and travels automatically; this client only
/// manages the short-lived access token.
pub struct ApiClient {
    /// Shared HTTP client with cookie store enabled
    http: Client,

    /// Base URL with trailing slash, endpoint paths are joined onto it
    base_url: Url,

    /// Shared access-token store
    tokens: Arc<TokenStore>,

    /// At most one token refresh in flight; a failure wave coalesces here
    refresh: SingleFlight<Option<String>>,
}

impl ApiClient {
    /// Create a new client from configuration and a token store
    pub fn new(config: &Config, tokens: Arc<TokenStore>) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = config.parsed_base_url()?;

        Ok(Self {
            http,
            base_url,
            tokens,
            refresh: SingleFlight::new(),
        })
    }

    /// The token store backing this client
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid endpoint path: {}", path))
            .map_err(ApiError::Internal)
    }

    pub(crate) fn http_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        Ok(self.http.request(method, url))
    }

    /// Execute a request, attaching the current access token and recovering
    /// from a single 401 via the shared refresh cycle.
    ///
    /// Non-401 responses are returned as-is regardless of status; a 401 that
    /// a refresh could not cure is surfaced as [`ApiError::Unauthorized`].
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        if let Some(token) = self.tokens.get().await {
            request
                .headers_mut()
                .insert(AUTHORIZATION, bearer_header(&token)?);
        }

        let method = request.method().clone();
        let url = request.url().clone();
        let mut retried = false;

        loop {
            let attempt = request
                .try_clone()
                .ok_or_else(|| ApiError::Internal(anyhow!("request body is not cloneable")))?;

            tracing::debug!(method = %method, url = %url, retried, "Sending HTTP request");

            let response = self.http.execute(attempt).await.map_err(ApiError::Network)?;
            let status = response.status();

            if status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            // Keep the original failure so it can be propagated verbatim
            // if the refresh does not produce a token.
            let denied = error_from_response(response).await;

            if retried {
                tracing::warn!(url = %url, "Request failed with 401 after retry, giving up");
                return Err(denied);
            }
            retried = true;

            tracing::warn!(url = %url, "Received 401, attempting token refresh");
            match self.refresh_access_token().await {
                Some(token) => {
                    request
                        .headers_mut()
                        .insert(AUTHORIZATION, bearer_header(&token)?);
                }
                None => return Err(denied),
            }
        }
    }

    /// Refresh the access token, coalescing concurrent callers onto a single
    /// call to the refresh endpoint. Returns the new token, or None if the
    /// session could not be renewed (the stored token is cleared then).
    async fn refresh_access_token(&self) -> Option<String> {
        let http = self.http.clone();
        let url = match self.endpoint("users/refresh-token") {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Refresh endpoint URL is invalid: {}", e);
                return None;
            }
        };
        let tokens = Arc::clone(&self.tokens);

        self.refresh
            .run(move || async move {
                match mint_access_token(&http, url).await {
                    Ok(token) => {
                        tokens.set(&token).await;
                        tracing::info!("Access token refreshed");
                        Some(token)
                    }
                    Err(e) => {
                        tracing::warn!("Token refresh failed: {:#}", e);
                        tokens.clear().await;
                        None
                    }
                }
            })
            .await
    }

    /// Send a request expecting a JSON body, mapping non-success statuses to
    /// the error taxonomy.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let body = response
            .json()
            .await
            .context("Failed to decode response body")?;
        Ok(body)
    }

    /// Send a request, discarding the response body
    pub(crate) async fn send_unit(&self, builder: RequestBuilder) -> Result<()> {
        self.send(builder).await?;
        Ok(())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        // A build failure is a malformed request, not a network fault.
        let request = builder.build().context("Failed to build request")?;
        let response = self.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.http_request(Method::GET, path)?;
        self.send_json(builder).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.http_request(Method::POST, path)?.json(body);
        self.send_json(builder).await
    }
}

/// Call the refresh endpoint, relying on the session cookie for eligibility
async fn mint_access_token(http: &Client, url: Url) -> anyhow::Result<String> {
    tracing::debug!("Refreshing access token...");

    let response = http
        .post(url)
        .send()
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("refresh endpoint returned {}: {}", status, body);
    }

    let data: RefreshResponse = response
        .json()
        .await
        .context("Failed to parse refresh response")?;

    data.access_token
        .filter(|t| !t.is_empty())
        .context("refresh response does not contain accessToken")
}

fn bearer_header(token: &str) -> Result<HeaderValue> {
    format!("Bearer {}", token)
        .parse()
        .context("access token is not a valid header value")
        .map_err(ApiError::Internal)
}

/// Turn an error response into the most specific error available,
/// preferring the backend's own `message` field.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unexpected error")
            .to_string()
    });

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized { message }
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull the human-readable message out of an error body, if it has one
fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}
