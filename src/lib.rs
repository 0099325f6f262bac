// Finboard API client - library root

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod single_flight;
pub mod token_store;

pub use client::ApiClient;
pub use config::Config;
pub use error::ApiError;
pub use token_store::TokenStore;
