pub mod accounts;
pub mod connection;
pub mod domain;
pub mod jsonrpc;
pub mod normalize;
pub mod ports;
pub mod signature;

pub use accounts::WalletCache;
pub use connection::{ConnectionDetails, DEFAULT_SERVICE_DOMAIN};
pub use domain::{
    Account, AuthenticationOptions, AuthenticationResult, Profile, RawSignature,
    RawSignatureRequest, SecretType, SignatureRequest, SigningResult, SigningServiceTransaction,
    SigningStatus, TransactionRequest, Wallet, WindowMode,
};
pub use jsonrpc::{codes, JsonRpcRequest, JsonRpcResponse, RpcError};
pub use normalize::{normalize_transaction, parse_hex_quantity};
pub use ports::{ClockPort, ProviderError, RpcTransport, SigningGateway};
pub use signature::{assemble_rsv_signature, even_hex};
