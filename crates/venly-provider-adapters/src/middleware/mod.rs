//! Stock middleware of the provider chain, in chain order.

pub mod cache;
pub mod filter;
pub mod fixture;
pub mod gas_fix;
pub mod nonce_tracker;
pub mod pending_nonce;
pub mod request_accounts;
pub mod rpc;
pub mod typed_data;
pub mod vm;
pub mod wallet;

pub use cache::CacheMiddleware;
pub use filter::FilterMiddleware;
pub use fixture::FixtureMiddleware;
pub use gas_fix::GasFixMiddleware;
pub use nonce_tracker::NonceTrackerMiddleware;
pub use pending_nonce::PendingNonceMiddleware;
pub use request_accounts::RequestAccountsMiddleware;
pub use rpc::RpcMiddleware;
pub use typed_data::TypedDataMiddleware;
pub use vm::VmMiddleware;
pub use wallet::{WalletMiddleware, WalletSettings};

use alloy::primitives::Address;
use serde_json::Value;

use venly_provider_core::{parse_hex_quantity, JsonRpcRequest, ProviderError};

pub(crate) fn quantity(field: &str, value: &Value) -> Result<u64, ProviderError> {
    let raw = value.as_str().ok_or_else(|| {
        ProviderError::Validation(format!("{field}: hex quantity expected, got {value}"))
    })?;
    let parsed = parse_hex_quantity(field, raw)?;
    u64::try_from(parsed)
        .map_err(|_| ProviderError::Validation(format!("{field} out of range: {parsed}")))
}

pub(crate) fn to_quantity(value: u64) -> Value {
    Value::String(format!("0x{value:x}"))
}

pub(crate) fn address(field: &str, value: Option<&Value>) -> Result<Address, ProviderError> {
    value
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Validation(format!("{field}: address expected")))?
        .parse()
        .map_err(|e| ProviderError::Validation(format!("{field}: invalid address: {e}")))
}

/// `eth_getTransactionCount(address, "pending")`
pub(crate) fn is_pending_nonce_query(request: &JsonRpcRequest) -> bool {
    request.method == "eth_getTransactionCount"
        && request.param(1).and_then(Value::as_str) == Some("pending")
}
