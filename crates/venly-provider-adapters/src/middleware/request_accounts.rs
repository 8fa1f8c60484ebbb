use std::sync::Arc;

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError, SigningGateway};

use crate::engine::{Middleware, Next};
use crate::middleware::wallet::WalletMiddleware;

/// Answers `eth_requestAccounts`, logging in when no session exists.
pub struct RequestAccountsMiddleware<G> {
    wallet: Arc<WalletMiddleware<G>>,
}

impl<G: SigningGateway> RequestAccountsMiddleware<G> {
    pub fn new(wallet: Arc<WalletMiddleware<G>>) -> Self {
        Self { wallet }
    }
}

impl<G: SigningGateway> Middleware for RequestAccountsMiddleware<G> {
    fn name(&self) -> &'static str {
        "request-accounts"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if request.method != "eth_requestAccounts" {
            return next.call(request);
        }
        Ok(serde_json::json!(self.wallet.accounts()?))
    }
}
