// Wire types for the Finboard backend

mod auth;
mod financial;

pub use auth::*;
pub use financial::*;

use serde::Deserialize;

/// Standard response envelope used by most endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}
