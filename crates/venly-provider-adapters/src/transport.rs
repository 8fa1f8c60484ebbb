use std::time::Duration;

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError, RpcError, RpcTransport};

/// JSON-RPC over HTTP POST against a single node endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    fn call(&self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| {
                ProviderError::Transport(format!("rpc request {} failed: {e}", request.method))
            })?;
        let status = response.status();
        let body: Value = response.json().map_err(|e| {
            ProviderError::Transport(format!("rpc json decode failed for {}: {e}", request.method))
        })?;
        if let Some(err) = body.get("error") {
            let err: RpcError = serde_json::from_value(err.clone()).map_err(|e| {
                ProviderError::Transport(format!("malformed rpc error object {err}: {e}"))
            })?;
            return Err(ProviderError::Rpc(err));
        }
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "rpc status {status}: {body}"
            )));
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}
