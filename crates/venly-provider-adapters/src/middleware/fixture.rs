use std::collections::HashMap;

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{Middleware, Next};

/// Answers a fixed set of methods with static results.
#[derive(Debug, Clone, Default)]
pub struct FixtureMiddleware {
    fixtures: HashMap<String, Value>,
}

impl FixtureMiddleware {
    pub fn new<I, K>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fixtures: fixtures.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn engine_defaults() -> Self {
        Self::new([
            (
                "web3_clientVersion",
                Value::from(format!(
                    "VenlyProviderEngine/v{}/rust",
                    env!("CARGO_PKG_VERSION")
                )),
            ),
            ("net_listening", Value::Bool(true)),
            ("eth_hashrate", Value::from("0x00")),
            ("eth_mining", Value::Bool(false)),
            ("eth_syncing", Value::Bool(true)),
        ])
    }
}

impl Middleware for FixtureMiddleware {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        match self.fixtures.get(&request.method) {
            Some(result) => Ok(result.clone()),
            None => next.call(request),
        }
    }
}
