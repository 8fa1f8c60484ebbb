use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    AuthenticationOptions, AuthenticationResult, SecretType, SignatureRequest, SigningResult,
    Wallet,
};
use crate::jsonrpc::{JsonRpcRequest, RpcError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("authentication required: {0}")]
    Authentication(String),
    /// Message is the gateway's error list joined with `", "`.
    #[error("{0}")]
    SigningFailure(String),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("provider not initialised: {0}")]
    NotInitialised(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),
}

/// Remote custodial signing service.
///
/// Implementations may block on user interaction (login popup, signing
/// confirmation); callers that need a deadline must enforce it themselves.
pub trait SigningGateway: Send + Sync {
    fn check_authenticated(&self) -> Result<AuthenticationResult, ProviderError>;

    fn authenticate(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationResult, ProviderError>;

    /// Wallets of the authenticated user for `secret_type`.
    fn list_wallets(&self, secret_type: SecretType) -> Result<Vec<Wallet>, ProviderError>;

    fn request_signature(&self, request: &SignatureRequest)
        -> Result<SigningResult, ProviderError>;
}

/// A JSON-RPC endpoint; `call` returns the `result` member or the upstream error.
pub trait RpcTransport: Send + Sync {
    fn call(&self, request: &JsonRpcRequest) -> Result<Value, ProviderError>;
}

pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> Result<u64, ProviderError>;
}
