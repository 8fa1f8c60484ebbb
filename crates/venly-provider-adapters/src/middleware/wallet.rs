use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use venly_provider_core::{
    assemble_rsv_signature, normalize_transaction, Account, AuthenticationOptions,
    AuthenticationResult, ClockPort, JsonRpcRequest, ProviderError, RawSignatureRequest,
    SecretType, SignatureRequest, SigningGateway, TransactionRequest, WalletCache,
};

use crate::engine::{Middleware, Next};

/// Account and signing methods answered by [`WalletMiddleware`].
pub fn is_wallet_method(method: &str) -> bool {
    matches!(
        method,
        "eth_accounts"
            | "eth_coinbase"
            | "eth_requestAccounts"
            | "eth_sendTransaction"
            | "eth_signTransaction"
            | "eth_sign"
            | "personal_sign"
            | "eth_signTypedData"
            | "eth_signTypedData_v1"
            | "eth_signTypedData_v3"
            | "eth_signTypedData_v4"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSettings {
    pub secret_type: SecretType,
    pub authentication_options: AuthenticationOptions,
    pub wallet_refresh_interval_ms: u64,
}

/// Last link of the chain: accounts and signatures come from the signing gateway.
pub struct WalletMiddleware<G> {
    gateway: Arc<G>,
    clock: Arc<dyn ClockPort>,
    settings: Mutex<WalletSettings>,
    cache: Mutex<WalletCache>,
}

impl<G: SigningGateway> WalletMiddleware<G> {
    pub fn new(gateway: Arc<G>, clock: Arc<dyn ClockPort>, settings: WalletSettings) -> Self {
        Self {
            gateway,
            clock,
            settings: Mutex::new(settings),
            cache: Mutex::new(WalletCache::default()),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    fn settings_guard(&self) -> Result<MutexGuard<'_, WalletSettings>, ProviderError> {
        self.settings
            .lock()
            .map_err(|e| ProviderError::Transport(format!("wallet settings lock poisoned: {e}")))
    }

    fn cache_guard(&self) -> Result<MutexGuard<'_, WalletCache>, ProviderError> {
        self.cache
            .lock()
            .map_err(|e| ProviderError::Transport(format!("wallet cache lock poisoned: {e}")))
    }

    pub fn settings(&self) -> Result<WalletSettings, ProviderError> {
        Ok(self.settings_guard()?.clone())
    }

    pub fn secret_type(&self) -> Result<SecretType, ProviderError> {
        Ok(self.settings_guard()?.secret_type)
    }

    /// Replaces the settings; a different secret type empties the wallet cache.
    pub fn set_settings(&self, settings: WalletSettings) -> Result<(), ProviderError> {
        let changed = {
            let mut g = self.settings_guard()?;
            let changed = g.secret_type != settings.secret_type;
            *g = settings;
            changed
        };
        if changed {
            self.cache_guard()?.clear();
        }
        Ok(())
    }

    pub fn set_secret_type(&self, secret_type: SecretType) -> Result<(), ProviderError> {
        let mut settings = self.settings()?;
        settings.secret_type = secret_type;
        self.set_settings(settings)
    }

    /// Clears the fetch timestamp so the next account read goes to the gateway.
    pub fn invalidate_wallets(&self) -> Result<(), ProviderError> {
        self.cache_guard()?.invalidate();
        Ok(())
    }

    pub fn last_wallets_fetch_ms(&self) -> Result<Option<u64>, ProviderError> {
        Ok(self.cache_guard()?.fetched_at_ms())
    }

    pub fn check_authenticated(&self) -> Result<AuthenticationResult, ProviderError> {
        self.gateway.check_authenticated()
    }

    /// Explicit login followed by a wallet refresh.
    pub fn start_get_account_flow(
        &self,
        options: Option<&AuthenticationOptions>,
    ) -> Result<Account, ProviderError> {
        let defaults = self.settings()?.authentication_options;
        let auth = self.gateway.authenticate(options.unwrap_or(&defaults))?;
        if !auth.is_authenticated {
            return Ok(Account {
                is_authenticated: false,
                profile: auth.profile,
                wallets: Vec::new(),
            });
        }
        self.refresh_wallets()?;
        Ok(Account {
            is_authenticated: true,
            profile: auth.profile,
            wallets: self.cache_guard()?.wallets().to_vec(),
        })
    }

    /// Cached addresses, refetched (logging in first if needed) once the cache is stale.
    pub fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        let settings = self.settings()?;
        let stale = {
            let cache = self.cache_guard()?;
            cache.secret_type() != Some(settings.secret_type)
                || cache.is_stale(self.clock.now_ms()?, settings.wallet_refresh_interval_ms)
        };
        if !stale {
            return self.cached_accounts();
        }
        if !self.gateway.check_authenticated()?.is_authenticated {
            self.gateway.authenticate(&settings.authentication_options)?;
        }
        self.refresh_wallets()
    }

    /// Fetches the wallet list. A failed fetch leaves the cache as it was.
    pub fn refresh_wallets(&self) -> Result<Vec<String>, ProviderError> {
        let secret_type = self.secret_type()?;
        let wallets = self.gateway.list_wallets(secret_type)?;
        let now = self.clock.now_ms()?;
        let mut cache = self.cache_guard()?;
        cache.refresh(secret_type, wallets, now);
        tracing::debug!(
            secret_type = %secret_type,
            wallets = cache.wallets().len(),
            "wallets refreshed"
        );
        Ok(cache.accounts())
    }

    pub fn cached_accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.cache_guard()?.accounts())
    }

    /// Wallet id for `address` among the cached wallets of the current secret type.
    pub fn resolve_wallet_id(&self, address: &str) -> Result<String, ProviderError> {
        let secret_type = self.secret_type()?;
        let cache = self.cache_guard()?;
        if cache.secret_type() != Some(secret_type) {
            return Ok(String::new());
        }
        Ok(cache.resolve_wallet_id(address))
    }

    // Unknown addresses get one refresh of a cache never fetched for this type.
    fn wallet_id_for(&self, address: &str) -> Result<String, ProviderError> {
        let id = self.resolve_wallet_id(address)?;
        if id.is_empty() {
            let secret_type = self.secret_type()?;
            let fetched = {
                let cache = self.cache_guard()?;
                cache.secret_type() == Some(secret_type) && cache.fetched_at_ms().is_some()
            };
            if !fetched {
                self.accounts()?;
                return self.resolve_wallet_id(address);
            }
        }
        Ok(id)
    }

    /// Signs `tx` remotely and returns the raw signed transaction.
    pub fn sign_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError> {
        let secret_type = self.secret_type()?;
        let wallet_id = self.wallet_id_for(&tx.from)?;
        if wallet_id.is_empty() {
            tracing::warn!(from = %tx.from, "no wallet found for sender address");
        }
        let request = normalize_transaction(tx, wallet_id, secret_type)?;
        tracing::info!(
            request_type = %request.request_type,
            wallet_id = %request.wallet_id,
            "requesting transaction signature"
        );
        self.gateway
            .request_signature(&SignatureRequest::Transaction(request))?
            .into_signed_transaction()
    }

    /// Signs `data` with the wallet holding `address`; returns the `0x` r‖s‖v signature.
    pub fn sign_personal_message(&self, data: &str, address: &str) -> Result<String, ProviderError> {
        let secret_type = self.secret_type()?;
        let request = RawSignatureRequest {
            request_type: secret_type.raw_request_type(),
            wallet_id: self.wallet_id_for(address)?,
            data: data.to_owned(),
        };
        tracing::info!(
            request_type = %request.request_type,
            wallet_id = %request.wallet_id,
            "requesting raw signature"
        );
        let signature = self
            .gateway
            .request_signature(&SignatureRequest::Raw(request))?
            .into_raw_signature()?;
        assemble_rsv_signature(&signature)
    }

    pub fn sign_typed_data(&self, _typed_data: &Value) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented("typed data signing"))
    }

    fn filled_transaction(
        &self,
        request: &JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<TransactionRequest, ProviderError> {
        let raw = request.param(0).cloned().ok_or_else(|| {
            ProviderError::Validation(format!("{}: transaction object expected", request.method))
        })?;
        let mut tx: TransactionRequest = serde_json::from_value(raw)
            .map_err(|e| ProviderError::Validation(format!("invalid transaction: {e}")))?;

        if tx.gas_price.is_none() {
            let price = next.dispatch(&JsonRpcRequest::new("eth_gasPrice", serde_json::json!([])))?;
            tx.gas_price = Some(hex_string("eth_gasPrice", price)?);
        }
        if tx.nonce.is_none() {
            let nonce = next.dispatch(&JsonRpcRequest::new(
                "eth_getTransactionCount",
                serde_json::json!([tx.from, "pending"]),
            ))?;
            tx.nonce = Some(hex_string("eth_getTransactionCount", nonce)?);
        }
        if tx.gas.is_none() {
            let estimate_for = serde_json::to_value(&tx)
                .map_err(|e| ProviderError::Validation(format!("invalid transaction: {e}")))?;
            let gas = next.dispatch(&JsonRpcRequest::new(
                "eth_estimateGas",
                Value::Array(vec![estimate_for]),
            ))?;
            tx.gas = Some(hex_string("eth_estimateGas", gas)?);
        }
        Ok(tx)
    }
}

impl<G: SigningGateway> Middleware for WalletMiddleware<G> {
    fn name(&self) -> &'static str {
        "wallet"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        match request.method.as_str() {
            "eth_accounts" | "eth_requestAccounts" => Ok(serde_json::json!(self.accounts()?)),
            "eth_coinbase" => Ok(self
                .accounts()?
                .into_iter()
                .next()
                .map(Value::String)
                .unwrap_or(Value::Null)),
            "eth_sendTransaction" => {
                let tx = self.filled_transaction(request, next)?;
                let raw = self.sign_transaction(&tx)?;
                next.dispatch(&JsonRpcRequest::new(
                    "eth_sendRawTransaction",
                    serde_json::json!([raw]),
                ))
            }
            "eth_signTransaction" => {
                let tx = self.filled_transaction(request, next)?;
                let raw = self.sign_transaction(&tx)?;
                Ok(serde_json::json!({ "raw": raw, "tx": tx }))
            }
            "eth_sign" => {
                let address = request.str_param(0)?;
                let data = request.str_param(1)?;
                Ok(Value::String(self.sign_personal_message(data, address)?))
            }
            "personal_sign" => {
                let data = request.str_param(0)?;
                let address = request.str_param(1)?;
                Ok(Value::String(self.sign_personal_message(data, address)?))
            }
            "eth_signTypedData" | "eth_signTypedData_v1" | "eth_signTypedData_v3"
            | "eth_signTypedData_v4" => {
                let typed = request.param(1).cloned().unwrap_or(Value::Null);
                Ok(Value::String(self.sign_typed_data(&typed)?))
            }
            _ => next.call(request),
        }
    }
}

fn hex_string(method: &str, value: Value) -> Result<String, ProviderError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ProviderError::Validation(format!(
            "{method}: hex quantity expected, got {other}"
        ))),
    }
}
