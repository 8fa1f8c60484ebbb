use std::sync::Arc;

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError, SigningGateway};

use crate::engine::{Middleware, Next};
use crate::middleware::wallet::WalletMiddleware;

/// Routes `eth_signTypedData_v3` / `_v4` to the wallet signer, whatever the params hold.
pub struct TypedDataMiddleware<G> {
    wallet: Arc<WalletMiddleware<G>>,
}

impl<G: SigningGateway> TypedDataMiddleware<G> {
    pub fn new(wallet: Arc<WalletMiddleware<G>>) -> Self {
        Self { wallet }
    }
}

impl<G: SigningGateway> Middleware for TypedDataMiddleware<G> {
    fn name(&self) -> &'static str {
        "typed-data"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if !matches!(
            request.method.as_str(),
            "eth_signTypedData_v3" | "eth_signTypedData_v4"
        ) {
            return next.call(request);
        }
        let typed = request.param(1).cloned().unwrap_or(Value::Null);
        Ok(Value::String(self.wallet.sign_typed_data(&typed)?))
    }
}
