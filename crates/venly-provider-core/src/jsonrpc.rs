use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::ProviderError;

pub mod codes {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// EIP-1193 `Unauthorized`.
    pub const UNAUTHORIZED: i64 = 4100;
    /// EIP-1193 `Unsupported Method`.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: Value::from(1),
            method: method.into(),
            params,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = id.into();
        self
    }

    /// Positional params; empty when `params` is absent or not an array.
    pub fn params(&self) -> &[Value] {
        self.params.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params().get(index)
    }

    pub fn str_param(&self, index: usize) -> Result<&str, ProviderError> {
        self.param(index).and_then(Value::as_str).ok_or_else(|| {
            ProviderError::Validation(format!(
                "{}: string expected at params[{index}]",
                self.method
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("no middleware handled method {method}"),
        )
    }
}

impl From<&ProviderError> for RpcError {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::Rpc(inner) => inner.clone(),
            ProviderError::Authentication(_) => Self::new(codes::UNAUTHORIZED, err.to_string()),
            ProviderError::NotImplemented(_) => {
                Self::new(codes::UNSUPPORTED_METHOD, err.to_string())
            }
            ProviderError::Validation(_) => Self::new(codes::INVALID_PARAMS, err.to_string()),
            ProviderError::SigningFailure(_)
            | ProviderError::NotInitialised(_)
            | ProviderError::Transport(_) => Self::new(codes::INTERNAL_ERROR, err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn from_outcome(id: Value, outcome: Result<Value, ProviderError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(err) => Self::failure(id, RpcError::from(&err)),
        }
    }

    /// `result` or the upstream error. A missing `result` reads as `null`.
    pub fn into_result(self) -> Result<Value, ProviderError> {
        match self.error {
            Some(err) => Err(ProviderError::Rpc(err)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
