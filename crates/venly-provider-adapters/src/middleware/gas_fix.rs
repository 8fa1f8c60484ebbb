use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{Middleware, Next};

/// Renames `gasLimit` to `gas` on outgoing transactions; some clients send the former.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasFixMiddleware;

impl Middleware for GasFixMiddleware {
    fn name(&self) -> &'static str {
        "gas-fix"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if !matches!(
            request.method.as_str(),
            "eth_sendTransaction" | "eth_signTransaction"
        ) {
            return next.call(request);
        }
        let Some(tx) = request.param(0).and_then(Value::as_object) else {
            return next.call(request);
        };
        if tx.contains_key("gas") || !tx.contains_key("gasLimit") {
            return next.call(request);
        }

        let mut tx = tx.clone();
        if let Some(limit) = tx.remove("gasLimit") {
            tx.insert("gas".to_owned(), limit);
        }
        let mut fixed = request.clone();
        if let Some(params) = fixed.params.as_array_mut() {
            params[0] = Value::Object(tx);
        }
        next.call(&fixed)
    }
}
