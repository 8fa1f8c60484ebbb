use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use venly_provider_core::connection::service_url;
use venly_provider_core::{
    AuthenticationOptions, ConnectionDetails, ProviderError, SecretType, WindowMode,
    DEFAULT_SERVICE_DOMAIN,
};

/// Supplies the current bearer token of the signing service session, if any.
pub type BearerTokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    /// `staging`, `qa`, `prod`, ...; a `-local` suffix is ignored for endpoints.
    pub environment: String,
    pub secret_type: SecretType,
    pub authentication_options: AuthenticationOptions,
    /// Start the chain without loading accounts (and thus without a login prompt).
    pub skip_authentication: bool,
    pub polling_interval_ms: u64,
    pub bearer_token_provider: Option<BearerTokenProvider>,
    pub window_mode: WindowMode,
    pub service_domain: String,
    /// Minimum age of the wallet cache before `eth_accounts` refetches it.
    pub wallet_refresh_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// How often a pending login is checked for a token.
    pub auth_poll_interval_ms: u64,
}

impl ProviderConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            environment: "staging".to_owned(),
            secret_type: SecretType::Ethereum,
            authentication_options: AuthenticationOptions::default(),
            skip_authentication: false,
            polling_interval_ms: 15_000,
            bearer_token_provider: None,
            window_mode: WindowMode::Popup,
            service_domain: DEFAULT_SERVICE_DOMAIN.to_owned(),
            wallet_refresh_interval_ms: 60_000,
            request_timeout_ms: 15_000,
            auth_poll_interval_ms: 1_000,
        }
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `VENLY_*` keys; unset or empty keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get("VENLY_CLIENT_ID")
            .ok_or_else(|| ProviderError::Validation("VENLY_CLIENT_ID is not set".to_owned()))?;
        let mut cfg = Self::new(client_id);

        if let Some(env) = get("VENLY_ENVIRONMENT") {
            cfg.environment = env;
        }
        if let Some(raw) = get("VENLY_SECRET_TYPE") {
            cfg.secret_type = raw.parse()?;
        }
        if let Some(raw) = get("VENLY_WINDOW_MODE") {
            cfg.window_mode = raw.parse()?;
        }
        if let Some(raw) = get("VENLY_SKIP_AUTHENTICATION") {
            cfg.skip_authentication = parse_flag("VENLY_SKIP_AUTHENTICATION", &raw)?;
        }
        if let Some(raw) = get("VENLY_POLLING_INTERVAL_MS") {
            cfg.polling_interval_ms = parse_ms("VENLY_POLLING_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = get("VENLY_REQUEST_TIMEOUT_MS") {
            cfg.request_timeout_ms = parse_ms("VENLY_REQUEST_TIMEOUT_MS", &raw)?;
        }
        if let Some(domain) = get("VENLY_SERVICE_DOMAIN") {
            cfg.service_domain = domain;
        }
        if let Some(token) = get("VENLY_BEARER_TOKEN") {
            cfg.bearer_token_provider = Some(Arc::new(move || Some(token.clone())));
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::Validation("client id must not be empty".to_owned()));
        }
        if self.secret_type == SecretType::Unsupported {
            return Err(ProviderError::Validation(
                "secret type is not supported by this provider".to_owned(),
            ));
        }
        if self.polling_interval_ms == 0 {
            return Err(ProviderError::Validation(
                "polling interval must be positive".to_owned(),
            ));
        }
        if self.request_timeout_ms == 0 || self.auth_poll_interval_ms == 0 {
            return Err(ProviderError::Validation(
                "timeouts and poll intervals must be positive".to_owned(),
            ));
        }
        if self.service_domain.trim().is_empty() {
            return Err(ProviderError::Validation(
                "service domain must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn connection_details(&self) -> ConnectionDetails {
        ConnectionDetails::derive(self.secret_type, &self.environment, &self.service_domain)
    }

    /// Signing service REST API, e.g. `https://api-staging.arkane.network`.
    pub fn api_base_url(&self) -> String {
        service_url("api", &self.environment, &self.service_domain)
    }

    /// Login / confirmation UI opened in the browser window.
    pub fn connect_base_url(&self) -> String {
        service_url("connect", &self.environment, &self.service_domain)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("environment", &self.environment)
            .field("secret_type", &self.secret_type)
            .field("authentication_options", &self.authentication_options)
            .field("skip_authentication", &self.skip_authentication)
            .field("polling_interval_ms", &self.polling_interval_ms)
            .field(
                "bearer_token_provider",
                &self.bearer_token_provider.as_ref().map(|_| "<fn>"),
            )
            .field("window_mode", &self.window_mode)
            .field("service_domain", &self.service_domain)
            .field("wallet_refresh_interval_ms", &self.wallet_refresh_interval_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("auth_poll_interval_ms", &self.auth_poll_interval_ms)
            .finish()
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ProviderError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ProviderError::Validation(format!(
            "{key}: expected boolean, got {other:?}"
        ))),
    }
}

fn parse_ms(key: &str, raw: &str) -> Result<u64, ProviderError> {
    raw.trim()
        .parse()
        .map_err(|e| ProviderError::Validation(format!("{key}: {e}")))
}
