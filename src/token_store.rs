// Access-token store
// Owns the bearer credential shared by all requests: in-memory value plus
// an optional cache file so a later process start picks the session back up.

use std::fs;
use std::path::PathBuf;

use tokio::sync::RwLock;

/// Shared store for the access token.
///
/// The token has a single logical writer at a time (login, refresh or
/// logout); reads may happen concurrently. Absence means "not
/// authenticated" until a login or refresh succeeds.
pub struct TokenStore {
    token: RwLock<Option<String>>,
    cache_file: Option<PathBuf>,
}

impl TokenStore {
    /// Store without persistence; starts empty
    pub fn in_memory() -> Self {
        Self {
            token: RwLock::new(None),
            cache_file: None,
        }
    }

    /// Store backed by a cache file, rehydrating any previously saved token
    pub fn with_cache_file(path: PathBuf) -> Self {
        let token = fs::read_to_string(&path)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|t| !t.is_empty());

        if token.is_some() {
            tracing::debug!("Loaded cached access token from {}", path.display());
        }

        Self {
            token: RwLock::new(token),
            cache_file: Some(path),
        }
    }

    /// Current access token, if any
    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replace the stored token (login or refresh)
    pub async fn set(&self, token: &str) {
        {
            let mut guard = self.token.write().await;
            *guard = Some(token.to_string());
        }

        if let Some(ref path) = self.cache_file {
            if let Some(parent) = path.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!("Failed to create token cache directory: {}", e);
                    return;
                }
            }
            if let Err(e) = tokio::fs::write(path, token).await {
                tracing::warn!("Failed to persist access token: {}", e);
            }
        }
    }

    /// Drop the stored token (logout or irrecoverable refresh failure)
    pub async fn clear(&self) {
        {
            let mut guard = self.token.write().await;
            *guard = None;
        }

        if let Some(ref path) = self.cache_file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove cached access token: {}", e),
            }
        }
    }
}
