use std::sync::Arc;

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError, RpcTransport};

use crate::engine::{Middleware, Next};
use crate::middleware::wallet::is_wallet_method;

/// Forwards everything except account and signing methods to the node.
#[derive(Clone)]
pub struct RpcMiddleware {
    transport: Arc<dyn RpcTransport>,
}

impl RpcMiddleware {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }
}

impl Middleware for RpcMiddleware {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        if is_wallet_method(&request.method) {
            return next.call(request);
        }
        self.transport.call(request)
    }
}
