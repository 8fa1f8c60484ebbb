#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use venly_provider_adapters::{InMemoryGateway, ProviderConfig, TransportFactory, VenlyProvider};
use venly_provider_core::{
    ClockPort, JsonRpcRequest, ProviderError, RpcError, RpcTransport, SecretType, Wallet,
};

pub const ADDRESS_A: &str = "0x1111111111111111111111111111111111111111";
pub const ADDRESS_B: &str = "0x2222222222222222222222222222222222222222";
pub const MATIC_ADDRESS: &str = "0x3333333333333333333333333333333333333333";

/// Manually advanced clock starting at a fixed instant.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self {
            now: Arc::new(AtomicU64::new(1_739_750_400_000)),
        }
    }
}

impl TestClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, ProviderError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}

/// Node stand-in: fixed answers per method, queued one-shot answers, and a call log.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    answers: Mutex<HashMap<String, Value>>,
    queued: Mutex<HashMap<String, VecDeque<Result<Value, ProviderError>>>>,
    calls: Mutex<Vec<JsonRpcRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        let transport = Arc::new(Self::default());
        transport.answer("eth_blockNumber", json!("0x10"));
        transport.answer("eth_chainId", json!("0x1"));
        transport.answer("eth_gasPrice", json!("0x3b9aca00"));
        transport.answer("eth_getTransactionCount", json!("0x5"));
        transport.answer("eth_estimateGas", json!("0x5208"));
        transport.answer(
            "eth_sendRawTransaction",
            json!("0x00000000000000000000000000000000000000000000000000000000000000aa"),
        );
        transport
    }

    pub fn answer(&self, method: &str, value: Value) {
        self.answers
            .lock()
            .expect("answers lock")
            .insert(method.to_owned(), value);
    }

    pub fn queue(&self, method: &str, outcome: Result<Value, ProviderError>) {
        self.queued
            .lock()
            .expect("queued lock")
            .entry(method.to_owned())
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<JsonRpcRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_of(&self, method: &str) -> Vec<JsonRpcRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("calls lock").clear();
    }
}

impl RpcTransport for ScriptedTransport {
    fn call(&self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        let queued = self
            .queued
            .lock()
            .expect("queued lock")
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = queued {
            return outcome;
        }
        self.answers
            .lock()
            .expect("answers lock")
            .get(&request.method)
            .cloned()
            .ok_or_else(|| ProviderError::Rpc(RpcError::method_not_found(&request.method)))
    }
}

pub fn wallet(id: &str, address: &str, secret_type: SecretType) -> Wallet {
    Wallet {
        id: id.to_owned(),
        address: address.to_owned(),
        secret_type,
        description: None,
    }
}

pub fn fixture_wallets() -> Vec<Wallet> {
    vec![
        wallet("wallet-a", ADDRESS_A, SecretType::Ethereum),
        wallet("wallet-b", ADDRESS_B, SecretType::Ethereum),
        wallet("wallet-matic", MATIC_ADDRESS, SecretType::Matic),
    ]
}

pub fn authenticated_gateway() -> InMemoryGateway {
    let gateway = InMemoryGateway::with_wallets(fixture_wallets());
    gateway
        .set_authenticated(true)
        .expect("authenticate gateway");
    gateway
}

pub fn test_config() -> ProviderConfig {
    let mut cfg = ProviderConfig::new("test-client");
    cfg.polling_interval_ms = 60_000;
    cfg
}

/// Provider wired to `transport`; every endpoint URL the factory sees is recorded.
pub fn new_provider(
    gateway: InMemoryGateway,
    transport: Arc<ScriptedTransport>,
    clock: TestClock,
    endpoints: Arc<Mutex<Vec<String>>>,
) -> VenlyProvider<InMemoryGateway> {
    let factory: TransportFactory = Arc::new(
        move |url: &str, _timeout: Duration| -> Result<Arc<dyn RpcTransport>, ProviderError> {
            endpoints.lock().expect("endpoints lock").push(url.to_owned());
            Ok(transport.clone())
        },
    );
    VenlyProvider::new(gateway)
        .with_clock(Arc::new(clock))
        .with_transport_factory(factory)
}

/// Running provider over the fixture wallets with default settings.
pub fn running_provider(
    transport: Arc<ScriptedTransport>,
) -> (VenlyProvider<InMemoryGateway>, InMemoryGateway) {
    let gateway = authenticated_gateway();
    let mut provider = new_provider(
        gateway.clone(),
        transport,
        TestClock::default(),
        Arc::new(Mutex::new(Vec::new())),
    );
    provider
        .create_provider_engine(test_config())
        .expect("create provider engine");
    (provider, gateway)
}
