use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ports::ProviderError;

/// Chain / account-type discriminator used by the signing service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretType {
    #[default]
    Ethereum,
    Matic,
    Bsc,
    Avac,
    Arbitrum,
    Optimism,
    Base,
    /// Any secret type this crate does not sign for (e.g. `BITCOIN`).
    #[serde(other)]
    Unsupported,
}

impl SecretType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ETHEREUM",
            Self::Matic => "MATIC",
            Self::Bsc => "BSC",
            Self::Avac => "AVAC",
            Self::Arbitrum => "ARBITRUM",
            Self::Optimism => "OPTIMISM",
            Self::Base => "BASE",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    /// Request type tag for transaction signing, e.g. `ETHEREUM_TRANSACTION`.
    pub fn transaction_request_type(self) -> String {
        format!("{}_TRANSACTION", self.as_str())
    }

    /// Request type tag for raw data signing, e.g. `ETHEREUM_RAW`.
    pub fn raw_request_type(self) -> String {
        format!("{}_RAW", self.as_str())
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ETHEREUM" => Ok(Self::Ethereum),
            "MATIC" => Ok(Self::Matic),
            "BSC" => Ok(Self::Bsc),
            "AVAC" => Ok(Self::Avac),
            "ARBITRUM" => Ok(Self::Arbitrum),
            "OPTIMISM" => Ok(Self::Optimism),
            "BASE" => Ok(Self::Base),
            other => Err(ProviderError::Validation(format!(
                "unsupported secret type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowMode {
    #[default]
    Popup,
    Redirect,
}

impl FromStr for WindowMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POPUP" => Ok(Self::Popup),
            "REDIRECT" => Ok(Self::Redirect),
            other => Err(ProviderError::Validation(format!(
                "unsupported window mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_popup: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub is_authenticated: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl AuthenticationResult {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            profile: None,
        }
    }
}

/// Outcome of the explicit account flow: who logged in and which wallets they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub is_authenticated: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub wallets: Vec<Wallet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub address: String,
    pub secret_type: SecretType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Transaction as it arrives in `eth_sendTransaction` / `eth_signTransaction`.
/// Numeric fields are hex quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Transaction signing request in the signing service's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningServiceTransaction {
    #[serde(rename = "type")]
    pub request_type: String,
    pub wallet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    pub data: String,
    pub value: u128,
    pub submit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignatureRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    pub wallet_id: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignatureRequest {
    Transaction(SigningServiceTransaction),
    Raw(RawSignatureRequest),
}

impl SignatureRequest {
    pub fn wallet_id(&self) -> &str {
        match self {
            Self::Transaction(tx) => &tx.wallet_id,
            Self::Raw(raw) => &raw.wallet_id,
        }
    }

    pub fn request_type(&self) -> &str {
        match self {
            Self::Transaction(tx) => &tx.request_type,
            Self::Raw(raw) => &raw.request_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningStatus {
    Success,
    Failure,
}

/// Terminal answer of the signing service. Never retried by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningResult {
    pub status: SigningStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SigningResult {
    pub fn success(result: Value) -> Self {
        Self {
            status: SigningStatus::Success,
            result: Some(result),
            errors: Vec::new(),
        }
    }

    pub fn failure<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: SigningStatus::Failure,
            result: None,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// The `result` payload of a SUCCESS, or a `SigningFailure` carrying the joined errors.
    pub fn into_payload(self) -> Result<Value, ProviderError> {
        match self.status {
            SigningStatus::Success => self.result.ok_or_else(|| {
                ProviderError::Validation("signing result without payload".to_owned())
            }),
            SigningStatus::Failure => Err(ProviderError::SigningFailure(self.errors.join(", "))),
        }
    }

    pub fn into_signed_transaction(self) -> Result<String, ProviderError> {
        let payload = self.into_payload()?;
        payload
            .get("signedTransaction")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                ProviderError::Validation("signing result missing signedTransaction".to_owned())
            })
    }

    pub fn into_raw_signature(self) -> Result<RawSignature, ProviderError> {
        let payload = self.into_payload()?;
        serde_json::from_value(payload)
            .map_err(|e| ProviderError::Validation(format!("invalid raw signature result: {e}")))
    }
}

/// r/s/v triple returned for raw signing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    pub r: String,
    pub s: String,
    #[serde(deserialize_with = "decimal_u64")]
    pub v: u64,
}

// `v` arrives either as a JSON number or as a decimal string.
fn decimal_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("v out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid v {s:?}: {e}"))),
        other => Err(D::Error::custom(format!("invalid v: {other}"))),
    }
}
