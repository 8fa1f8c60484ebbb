use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use venly_provider_core::{
    Account, AuthenticationOptions, AuthenticationResult, ClockPort, ProviderError, RpcTransport,
    SecretType, SigningGateway,
};

use crate::clock::SystemClockAdapter;
use crate::config::ProviderConfig;
use crate::engine::ProviderEngine;
use crate::middleware::{
    CacheMiddleware, FilterMiddleware, FixtureMiddleware, GasFixMiddleware,
    NonceTrackerMiddleware, PendingNonceMiddleware, RequestAccountsMiddleware, RpcMiddleware,
    TypedDataMiddleware, VmMiddleware, WalletMiddleware, WalletSettings,
};
use crate::transport::HttpTransport;

/// Builds the node transport for an endpoint URL and request timeout.
pub type TransportFactory =
    Arc<dyn Fn(&str, Duration) -> Result<Arc<dyn RpcTransport>, ProviderError> + Send + Sync>;

/// Owns the signing gateway and the active provider chain.
///
/// Lifecycle changes take `&mut self`, so they are serialized by whoever owns
/// the provider. The wallet signer, typed-data and accounts handlers are
/// created once and reused by every chain built afterwards.
pub struct VenlyProvider<G: SigningGateway + 'static> {
    gateway: Arc<G>,
    clock: Arc<dyn ClockPort>,
    transports: TransportFactory,
    wallet: Option<Arc<WalletMiddleware<G>>>,
    typed_data: Option<Arc<TypedDataMiddleware<G>>>,
    request_accounts: Option<Arc<RequestAccountsMiddleware<G>>>,
    config: Option<ProviderConfig>,
    engine: Option<ProviderEngine>,
}

impl<G: SigningGateway + 'static> VenlyProvider<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway: Arc::new(gateway),
            clock: Arc::new(SystemClockAdapter),
            transports: Arc::new(
                |url: &str, timeout: Duration| -> Result<Arc<dyn RpcTransport>, ProviderError> {
                    Ok(Arc::new(HttpTransport::new(url, timeout)?))
                },
            ),
            wallet: None,
            typed_data: None,
            request_accounts: None,
            config: None,
            engine: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transport_factory(mut self, transports: TransportFactory) -> Self {
        self.transports = transports;
        self
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn has_chain(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&ProviderEngine> {
        self.engine.as_ref()
    }

    pub fn config(&self) -> Option<&ProviderConfig> {
        self.config.as_ref()
    }

    pub fn wallet_middleware(&self) -> Option<&Arc<WalletMiddleware<G>>> {
        self.wallet.as_ref()
    }

    fn initialised_wallet(&self) -> Result<&Arc<WalletMiddleware<G>>, ProviderError> {
        self.wallet.as_ref().ok_or_else(|| {
            ProviderError::NotInitialised("create_provider_engine has not been called".to_owned())
        })
    }

    pub fn check_authenticated(&self) -> Result<AuthenticationResult, ProviderError> {
        self.initialised_wallet()?.check_authenticated()
    }

    /// Logs in (with `options`, or the configured ones) and loads the user's wallets.
    pub fn authenticate(
        &self,
        options: Option<&AuthenticationOptions>,
    ) -> Result<Account, ProviderError> {
        self.initialised_wallet()?.start_get_account_flow(options)
    }

    /// Sends a request through the active chain.
    pub fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let engine = self.engine.as_ref().ok_or_else(|| {
            ProviderError::NotInitialised("no provider chain has been built".to_owned())
        })?;
        engine.request(method, params)
    }

    /// Builds a chain for `config` and swaps it in place of the running one.
    ///
    /// The new chain and config are kept even when the account load fails;
    /// the chain then stays stopped until the next successful rebuild.
    pub fn create_provider_engine(&mut self, config: ProviderConfig) -> Result<(), ProviderError> {
        config.validate()?;
        let connection = config.connection_details();
        let node = (self.transports)(&connection.endpoint_http_url, config.request_timeout())?;

        let settings = WalletSettings {
            secret_type: config.secret_type,
            authentication_options: config.authentication_options.clone(),
            wallet_refresh_interval_ms: config.wallet_refresh_interval_ms,
        };
        let wallet = match &self.wallet {
            Some(wallet) => Arc::clone(wallet),
            None => Arc::new(WalletMiddleware::new(
                Arc::clone(&self.gateway),
                Arc::clone(&self.clock),
                settings.clone(),
            )),
        };
        let typed_data = match &self.typed_data {
            Some(typed_data) => Arc::clone(typed_data),
            None => Arc::new(TypedDataMiddleware::new(Arc::clone(&wallet))),
        };
        let request_accounts = match &self.request_accounts {
            Some(request_accounts) => Arc::clone(request_accounts),
            None => Arc::new(RequestAccountsMiddleware::new(Arc::clone(&wallet))),
        };

        let mut engine = ProviderEngine::new(config.polling_interval());
        let tracker = engine.block_tracker();
        engine.add_middleware(Arc::new(FixtureMiddleware::engine_defaults()))?;
        engine.add_middleware(Arc::new(GasFixMiddleware))?;
        engine.add_middleware(typed_data.clone())?;
        engine.add_middleware(request_accounts.clone())?;
        engine.add_middleware(Arc::new(PendingNonceMiddleware::new(Arc::clone(&node))))?;
        engine.add_middleware(Arc::new(CacheMiddleware::new(tracker.clone())))?;
        engine.add_middleware(Arc::new(FilterMiddleware::new(tracker)))?;
        engine.add_middleware(Arc::new(NonceTrackerMiddleware::new()))?;
        engine.add_middleware(Arc::new(VmMiddleware))?;
        engine.add_middleware(Arc::new(RpcMiddleware::new(node)))?;
        engine.add_middleware(wallet.clone())?;

        if let Some(mut old) = self.engine.take() {
            old.stop();
        }
        wallet.set_settings(settings)?;
        self.wallet = Some(Arc::clone(&wallet));
        self.typed_data = Some(typed_data);
        self.request_accounts = Some(request_accounts);
        let secret_type = config.secret_type;
        let environment = config.environment.clone();
        let skip_authentication = config.skip_authentication;
        self.config = Some(config);
        let engine = self.engine.insert(engine);

        if !skip_authentication {
            let accounts = wallet.accounts().map_err(|err| {
                tracing::warn!(error = %err, "account load failed, provider chain left stopped");
                err
            })?;
            tracing::debug!(accounts = accounts.len(), "accounts loaded");
        }

        engine.start()?;
        tracing::info!(
            secret_type = %secret_type,
            environment = %environment,
            endpoint = %connection.endpoint_http_url,
            "provider chain started"
        );
        Ok(())
    }

    /// Rebuilds the chain for `secret_type`. Fails when no chain has been built yet.
    pub fn change_secret_type(&mut self, secret_type: SecretType) -> Result<(), ProviderError> {
        let (Some(_), Some(config)) = (&self.engine, &self.config) else {
            return Err(ProviderError::NotInitialised(
                "no provider chain to switch secret type on".to_owned(),
            ));
        };
        let mut config = config.clone();
        config.secret_type = secret_type;
        self.initialised_wallet()?.invalidate_wallets()?;
        tracing::info!(secret_type = %secret_type, "switching secret type");
        self.create_provider_engine(config)
    }

    /// Stops the active chain; it can be rebuilt with `create_provider_engine`.
    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
    }
}
