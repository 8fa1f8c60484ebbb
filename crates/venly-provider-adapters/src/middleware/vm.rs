use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{Middleware, Next};

/// Call/estimate stage. Execution itself happens on the node; this stage only
/// completes the block argument the node would otherwise reject.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmMiddleware;

impl Middleware for VmMiddleware {
    fn name(&self) -> &'static str {
        "vm"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if request.method != "eth_call" || request.params().len() != 1 {
            return next.call(request);
        }
        let mut call = request.clone();
        if let Some(params) = call.params.as_array_mut() {
            params.push(Value::from("latest"));
        }
        next.call(&call)
    }
}
