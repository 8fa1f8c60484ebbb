use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError, RpcTransport};

use crate::engine::{Middleware, Next};
use crate::middleware::{address, is_pending_nonce_query, quantity, to_quantity};

/// Hands out pending nonces that never go backwards.
///
/// Pending counts come straight from the node endpoint, bypassing the response
/// cache, and are raised to the next nonce after the last transaction this
/// chain sent. Transactions without a nonce get one assigned here.
pub struct PendingNonceMiddleware {
    node: Arc<dyn RpcTransport>,
    next_nonce: Mutex<HashMap<Address, u64>>,
}

impl PendingNonceMiddleware {
    pub fn new(node: Arc<dyn RpcTransport>) -> Self {
        Self {
            node,
            next_nonce: Mutex::new(HashMap::new()),
        }
    }

    pub fn pending_nonce(&self, account: Address) -> Result<u64, ProviderError> {
        let request = JsonRpcRequest::new(
            "eth_getTransactionCount",
            serde_json::json!([account.to_string(), "pending"]),
        );
        let remote = quantity("pending nonce", &self.node.call(&request)?)?;
        let local = self.local(account)?;
        Ok(local.map_or(remote, |local| local.max(remote)))
    }

    fn local(&self, account: Address) -> Result<Option<u64>, ProviderError> {
        let g = self
            .next_nonce
            .lock()
            .map_err(|e| ProviderError::Transport(format!("nonce lock poisoned: {e}")))?;
        Ok(g.get(&account).copied())
    }

    fn record_sent(&self, account: Address, nonce: u64) -> Result<(), ProviderError> {
        let mut g = self
            .next_nonce
            .lock()
            .map_err(|e| ProviderError::Transport(format!("nonce lock poisoned: {e}")))?;
        let next = nonce.saturating_add(1);
        let entry = g.entry(account).or_insert(next);
        *entry = (*entry).max(next);
        Ok(())
    }

    fn send_transaction(
        &self,
        request: &JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<Value, ProviderError> {
        let Some(tx) = request.param(0).and_then(Value::as_object) else {
            return next.call(request);
        };
        let from = address("from", tx.get("from"))?;
        let (nonce, request) = match tx.get("nonce").filter(|n| !n.is_null()) {
            Some(nonce) => (quantity("nonce", nonce)?, request.clone()),
            None => {
                let nonce = self.pending_nonce(from)?;
                let mut tx = tx.clone();
                tx.insert("nonce".to_owned(), to_quantity(nonce));
                let mut with_nonce = request.clone();
                if let Some(params) = with_nonce.params.as_array_mut() {
                    params[0] = Value::Object(tx);
                }
                (nonce, with_nonce)
            }
        };

        let hash = next.call(&request)?;
        self.record_sent(from, nonce)?;
        Ok(hash)
    }
}

impl Middleware for PendingNonceMiddleware {
    fn name(&self) -> &'static str {
        "pending-nonce"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if is_pending_nonce_query(request) {
            let account = address("eth_getTransactionCount", request.param(0))?;
            return Ok(to_quantity(self.pending_nonce(account)?));
        }
        if request.method == "eth_sendTransaction" {
            return self.send_transaction(request, next);
        }
        next.call(request)
    }
}
