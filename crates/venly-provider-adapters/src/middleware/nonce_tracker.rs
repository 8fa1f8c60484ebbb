use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::Address;
use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{Middleware, Next};
use crate::middleware::{address, is_pending_nonce_query, quantity, to_quantity};

/// Caches pending nonces per account and bumps them after successful sends.
#[derive(Debug, Default)]
pub struct NonceTrackerMiddleware {
    cache: Mutex<HashMap<Address, u64>>,
}

impl NonceTrackerMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, account: Address) -> Option<u64> {
        self.cache.lock().ok().and_then(|g| g.get(&account).copied())
    }

    fn with_cache<T>(
        &self,
        f: impl FnOnce(&mut HashMap<Address, u64>) -> T,
    ) -> Result<T, ProviderError> {
        let mut g = self
            .cache
            .lock()
            .map_err(|e| ProviderError::Transport(format!("nonce cache lock poisoned: {e}")))?;
        Ok(f(&mut g))
    }

    fn send_transaction(
        &self,
        request: &JsonRpcRequest,
        next: Next<'_>,
    ) -> Result<Value, ProviderError> {
        let tx = request.param(0).and_then(Value::as_object);
        let from = tx.and_then(|tx| address("from", tx.get("from")).ok());
        let nonce = tx
            .and_then(|tx| tx.get("nonce"))
            .filter(|n| !n.is_null())
            .map(|n| quantity("nonce", n))
            .transpose()?;

        match next.call(request) {
            Ok(hash) => {
                if let Some(from) = from {
                    self.with_cache(|cache| match nonce {
                        Some(nonce) => {
                            cache.insert(from, nonce.saturating_add(1));
                        }
                        None => {
                            if let Some(cached) = cache.get_mut(&from) {
                                *cached = cached.saturating_add(1);
                            }
                        }
                    })?;
                }
                Ok(hash)
            }
            Err(err) => {
                if let Some(from) = from {
                    self.with_cache(|cache| cache.remove(&from))?;
                }
                Err(err)
            }
        }
    }
}

impl Middleware for NonceTrackerMiddleware {
    fn name(&self) -> &'static str {
        "nonce-tracker"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if is_pending_nonce_query(request) {
            let account = address("eth_getTransactionCount", request.param(0))?;
            if let Some(nonce) = self.cached(account) {
                return Ok(to_quantity(nonce));
            }
            let result = next.call(request)?;
            let nonce = quantity("pending nonce", &result)?;
            self.with_cache(|cache| cache.insert(account, nonce))?;
            return Ok(result);
        }
        if request.method == "eth_sendTransaction" {
            return self.send_transaction(request, next);
        }
        next.call(request)
    }
}
