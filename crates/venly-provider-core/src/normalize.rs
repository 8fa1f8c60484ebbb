use crate::domain::{SecretType, SigningServiceTransaction, TransactionRequest};
use crate::ports::ProviderError;

/// Parses a hex quantity (`0x`-prefixed or bare). `"0x"` reads as zero.
pub fn parse_hex_quantity(field: &str, raw: &str) -> Result<u128, ProviderError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::Validation(format!("invalid hex {field} {raw:?}: {e}")))
}

fn optional_quantity(field: &str, raw: Option<&str>) -> Result<Option<u128>, ProviderError> {
    match raw {
        Some(raw) if !raw.is_empty() => parse_hex_quantity(field, raw).map(Some),
        _ => Ok(None),
    }
}

fn narrow_u64(field: &str, value: Option<u128>) -> Result<Option<u64>, ProviderError> {
    value
        .map(|v| {
            u64::try_from(v)
                .map_err(|_| ProviderError::Validation(format!("{field} exceeds u64: {v}")))
        })
        .transpose()
}

/// Converts a JSON-RPC transaction into the signing service's transaction shape.
///
/// `gasPrice`, `gas` and `nonce` stay absent when absent; `value` defaults to
/// zero. The remote service expects exactly this asymmetry. `submit` is always
/// false so the service never broadcasts on its own.
pub fn normalize_transaction(
    request: &TransactionRequest,
    wallet_id: impl Into<String>,
    secret_type: SecretType,
) -> Result<SigningServiceTransaction, ProviderError> {
    let gas_price = optional_quantity("gasPrice", request.gas_price.as_deref())?;
    let gas = narrow_u64("gas", optional_quantity("gas", request.gas.as_deref())?)?;
    let nonce = narrow_u64("nonce", optional_quantity("nonce", request.nonce.as_deref())?)?;
    let value = optional_quantity("value", request.value.as_deref())?.unwrap_or(0);
    let data = match request.data.as_deref() {
        Some(data) if !data.is_empty() => data.to_owned(),
        _ => "0x".to_owned(),
    };

    Ok(SigningServiceTransaction {
        request_type: secret_type.transaction_request_type(),
        wallet_id: wallet_id.into(),
        gas_price,
        gas,
        to: request.to.clone(),
        nonce,
        data,
        value,
        submit: false,
    })
}
