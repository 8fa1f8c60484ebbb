use std::sync::Arc;
use std::thread;
use std::time::Duration;

use venly_provider_core::{ProviderError, WindowMode};

use crate::config::{BearerTokenProvider, ProviderConfig};

/// Interactive login against the signing service.
pub trait AuthorizationFlow: Send + Sync {
    /// Runs the login at `login_url` and returns the resulting bearer token.
    /// May block for as long as the user takes.
    fn authorize(&self, login_url: &str) -> Result<String, ProviderError>;
}

pub type WindowOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Opens the login page in the system browser and waits for the host
/// application to hand over the token through the bearer token provider.
#[derive(Clone)]
pub struct PopupAuthorizationFlow {
    window_mode: WindowMode,
    tokens: Option<BearerTokenProvider>,
    poll_interval: Duration,
    opener: WindowOpener,
}

impl PopupAuthorizationFlow {
    pub fn with_config(config: &ProviderConfig) -> Self {
        Self {
            window_mode: config.window_mode,
            tokens: config.bearer_token_provider.clone(),
            poll_interval: Duration::from_millis(config.auth_poll_interval_ms),
            opener: Arc::new(|url: &str| open::that(url)),
        }
    }

    pub fn with_opener(mut self, opener: WindowOpener) -> Self {
        self.opener = opener;
        self
    }
}

impl AuthorizationFlow for PopupAuthorizationFlow {
    fn authorize(&self, login_url: &str) -> Result<String, ProviderError> {
        if let Some(token) = self.tokens.as_ref().and_then(|t| t()) {
            return Ok(token);
        }
        let tokens = self.tokens.as_ref().ok_or_else(|| {
            ProviderError::Authentication(
                "no bearer token provider configured to complete the login".to_owned(),
            )
        })?;

        tracing::info!(url = %login_url, mode = ?self.window_mode, "opening signing service login");
        (self.opener)(login_url).map_err(|e| {
            ProviderError::Authentication(format!("failed to open login window: {e}"))
        })?;

        if self.window_mode == WindowMode::Redirect {
            return Err(ProviderError::Authentication(format!(
                "redirected to {login_url}; retry once the session is established"
            )));
        }

        loop {
            if let Some(token) = tokens() {
                tracing::debug!("login completed");
                return Ok(token);
            }
            thread::sleep(self.poll_interval);
        }
    }
}
