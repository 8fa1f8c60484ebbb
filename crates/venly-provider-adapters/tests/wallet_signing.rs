mod common;

use std::sync::{Arc, Mutex};

use serde_json::json;

use venly_provider_core::{
    codes, JsonRpcRequest, ProviderError, RpcError, SignatureRequest, SigningResult,
    SigningServiceTransaction,
};

use common::{
    authenticated_gateway, new_provider, running_provider, test_config, ScriptedTransport,
    TestClock, ADDRESS_A, ADDRESS_B,
};

const TX_HASH: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";

fn submitted_transaction(request: &SignatureRequest) -> &SigningServiceTransaction {
    match request {
        SignatureRequest::Transaction(tx) => tx,
        other => panic!("expected transaction request, got {other:?}"),
    }
}

#[test]
fn send_transaction_fills_missing_fields_signs_and_broadcasts() {
    let transport = ScriptedTransport::new();
    let (provider, gateway) = running_provider(Arc::clone(&transport));

    let hash = provider
        .request(
            "eth_sendTransaction",
            json!([{ "from": ADDRESS_A, "to": ADDRESS_B, "value": "0x10" }]),
        )
        .expect("send transaction");
    assert_eq!(hash, json!(TX_HASH));

    let submitted = gateway.submitted_requests().expect("submitted");
    assert_eq!(submitted.len(), 1);
    let tx = submitted_transaction(&submitted[0]);
    assert_eq!(tx.request_type, "ETHEREUM_TRANSACTION");
    assert_eq!(tx.wallet_id, "wallet-a");
    assert_eq!(tx.to.as_deref(), Some(ADDRESS_B));
    assert_eq!(tx.gas_price, Some(1_000_000_000));
    assert_eq!(tx.gas, Some(21_000));
    assert_eq!(tx.nonce, Some(5));
    assert_eq!(tx.value, 16);
    assert_eq!(tx.data, "0x");
    assert!(!tx.submit);

    let raw_sends = transport.calls_of("eth_sendRawTransaction");
    assert_eq!(raw_sends.len(), 1);
    let raw = raw_sends[0].str_param(0).expect("raw transaction");
    assert!(raw.starts_with("0x"));
}

#[test]
fn consecutive_sends_use_increasing_nonces() {
    let transport = ScriptedTransport::new();
    let (provider, gateway) = running_provider(Arc::clone(&transport));

    for _ in 0..2 {
        provider
            .request(
                "eth_sendTransaction",
                json!([{ "from": ADDRESS_A, "to": ADDRESS_B }]),
            )
            .expect("send transaction");
    }

    let nonces: Vec<_> = gateway
        .submitted_requests()
        .expect("submitted")
        .iter()
        .map(|r| submitted_transaction(r).nonce)
        .collect();
    assert_eq!(nonces, vec![Some(5), Some(6)]);
}

#[test]
fn gas_limit_is_sent_as_gas() {
    let transport = ScriptedTransport::new();
    let (provider, gateway) = running_provider(Arc::clone(&transport));

    provider
        .request(
            "eth_sendTransaction",
            json!([{ "from": ADDRESS_A, "to": ADDRESS_B, "gasLimit": "0x7530" }]),
        )
        .expect("send transaction");

    let submitted = gateway.submitted_requests().expect("submitted");
    assert_eq!(submitted_transaction(&submitted[0]).gas, Some(30_000));
    assert!(transport.calls_of("eth_estimateGas").is_empty());
}

#[test]
fn sign_transaction_returns_raw_and_filled_tx() {
    let (provider, _gateway) = running_provider(ScriptedTransport::new());

    let signed = provider
        .request(
            "eth_signTransaction",
            json!([{ "from": ADDRESS_A, "to": ADDRESS_B, "nonce": "0x9" }]),
        )
        .expect("sign transaction");

    assert!(signed["raw"]
        .as_str()
        .expect("raw")
        .starts_with("0x"));
    assert_eq!(signed["tx"]["nonce"], json!("0x9"));
    assert_eq!(signed["tx"]["gasPrice"], json!("0x3b9aca00"));
    assert_eq!(signed["tx"]["gas"], json!("0x5208"));
}

#[test]
fn signing_failure_carries_joined_errors() {
    let transport = ScriptedTransport::new();
    let (provider, gateway) = running_provider(Arc::clone(&transport));
    gateway
        .push_result(SigningResult::failure(["insufficient funds", "nonce too low"]))
        .expect("script failure");

    let err = provider
        .request(
            "eth_sendTransaction",
            json!([{ "from": ADDRESS_A, "to": ADDRESS_B, "nonce": "0x1", "gas": "0x5208", "gasPrice": "0x1" }]),
        )
        .expect_err("signing fails");

    assert_eq!(
        err,
        ProviderError::SigningFailure("insufficient funds, nonce too low".to_owned())
    );
    assert_eq!(err.to_string(), "insufficient funds, nonce too low");
    assert!(transport.calls_of("eth_sendRawTransaction").is_empty());
}

#[test]
fn personal_sign_assembles_rsv_signature() {
    let (provider, gateway) = running_provider(ScriptedTransport::new());
    gateway
        .push_result(SigningResult::success(json!({ "r": "aa", "s": "bb", "v": 1 })))
        .expect("script v=1");
    gateway
        .push_result(SigningResult::success(json!({ "r": "0xaa", "s": "0xbb", "v": "255" })))
        .expect("script v=255");

    let first = provider
        .request("personal_sign", json!(["0xdeadbeef", ADDRESS_A]))
        .expect("personal_sign");
    assert_eq!(first, json!("0xaabb01"));

    let second = provider
        .request("eth_sign", json!([ADDRESS_A, "0xdeadbeef"]))
        .expect("eth_sign");
    assert_eq!(second, json!("0xaabbff"));

    let submitted = gateway.submitted_requests().expect("submitted");
    let SignatureRequest::Raw(raw) = &submitted[0] else {
        panic!("expected raw request");
    };
    assert_eq!(raw.request_type, "ETHEREUM_RAW");
    assert_eq!(raw.wallet_id, "wallet-a");
    assert_eq!(raw.data, "0xdeadbeef");
}

#[test]
fn unknown_sender_passes_empty_wallet_id_and_fails() {
    let (provider, gateway) = running_provider(ScriptedTransport::new());
    let stranger = "0x9999999999999999999999999999999999999999";

    let err = provider
        .request("personal_sign", json!(["0x01", stranger]))
        .expect_err("unknown wallet");

    assert!(matches!(err, ProviderError::SigningFailure(_)));
    let submitted = gateway.submitted_requests().expect("submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].wallet_id(), "");
}

#[test]
fn typed_data_signing_is_not_implemented() {
    let (provider, gateway) = running_provider(ScriptedTransport::new());
    let typed = json!({ "types": {}, "primaryType": "Mail", "domain": {}, "message": {} });

    for method in ["eth_signTypedData", "eth_signTypedData_v3", "eth_signTypedData_v4"] {
        let err = provider
            .request(method, json!([ADDRESS_A, typed.clone()]))
            .expect_err("typed data rejected");
        assert_eq!(err, ProviderError::NotImplemented("typed data signing"));
    }
    let encoded = provider
        .request("eth_signTypedData_v4", json!([ADDRESS_A, typed.to_string()]))
        .expect_err("encoded typed data rejected");
    assert_eq!(encoded, ProviderError::NotImplemented("typed data signing"));

    let response = provider
        .engine()
        .expect("engine")
        .send(&JsonRpcRequest::new("eth_signTypedData_v4", json!([ADDRESS_A, typed])).with_id(7));
    assert_eq!(response.id, json!(7));
    assert_eq!(
        response.error.expect("error").code,
        codes::UNSUPPORTED_METHOD
    );
    assert!(gateway.submitted_requests().expect("submitted").is_empty());
}

#[test]
fn typed_data_rejection_ignores_malformed_or_missing_payload() {
    let (provider, gateway) = running_provider(ScriptedTransport::new());

    let cases = [
        ("eth_signTypedData_v4", json!([ADDRESS_A, "not json"])),
        ("eth_signTypedData_v3", json!([ADDRESS_A])),
        ("eth_signTypedData_v4", json!([])),
        ("eth_signTypedData", json!([ADDRESS_A, 42])),
    ];
    for (method, params) in cases {
        let err = provider
            .request(method, params.clone())
            .expect_err("typed data rejected");
        assert_eq!(
            err,
            ProviderError::NotImplemented("typed data signing"),
            "{method} {params}"
        );
        assert_eq!(RpcError::from(&err).code, codes::UNSUPPORTED_METHOD);
    }
    assert!(gateway.submitted_requests().expect("submitted").is_empty());
}

#[test]
fn accounts_and_coinbase_come_from_the_wallet_cache() {
    let (provider, _gateway) = running_provider(ScriptedTransport::new());

    assert_eq!(
        provider.request("eth_accounts", json!([])).expect("accounts"),
        json!([ADDRESS_A, ADDRESS_B])
    );
    assert_eq!(
        provider
            .request("eth_requestAccounts", json!([]))
            .expect("request accounts"),
        json!([ADDRESS_A, ADDRESS_B])
    );
    assert_eq!(
        provider.request("eth_coinbase", json!([])).expect("coinbase"),
        json!(ADDRESS_A)
    );
}

#[test]
fn wallet_list_is_refetched_only_after_refresh_interval() {
    let clock = TestClock::default();
    let gateway = authenticated_gateway();
    let mut provider = new_provider(
        gateway.clone(),
        ScriptedTransport::new(),
        clock.clone(),
        Arc::new(Mutex::new(Vec::new())),
    );
    provider
        .create_provider_engine(test_config())
        .expect("create chain");
    assert_eq!(gateway.wallet_fetch_count().expect("fetches"), 1);

    provider.request("eth_accounts", json!([])).expect("cached");
    assert_eq!(gateway.wallet_fetch_count().expect("fetches"), 1);

    clock.advance(60_000);
    provider.request("eth_accounts", json!([])).expect("refreshed");
    assert_eq!(gateway.wallet_fetch_count().expect("fetches"), 2);
}

#[test]
fn failed_wallet_refresh_keeps_previous_cache() {
    let clock = TestClock::default();
    let gateway = authenticated_gateway();
    let mut provider = new_provider(
        gateway.clone(),
        ScriptedTransport::new(),
        clock.clone(),
        Arc::new(Mutex::new(Vec::new())),
    );
    provider
        .create_provider_engine(test_config())
        .expect("create chain");

    clock.advance(60_000);
    gateway
        .fail_next_wallet_fetch(ProviderError::Transport("service unavailable".to_owned()))
        .expect("script fetch failure");

    let err = provider
        .request("eth_accounts", json!([]))
        .expect_err("refresh fails");
    assert_eq!(
        err,
        ProviderError::Transport("service unavailable".to_owned())
    );
    let cached = provider
        .wallet_middleware()
        .expect("wallet")
        .cached_accounts()
        .expect("cached");
    assert_eq!(cached, vec![ADDRESS_A.to_owned(), ADDRESS_B.to_owned()]);
}

#[test]
fn wallet_methods_never_reach_the_node() {
    let transport = ScriptedTransport::new();
    let (provider, _gateway) = running_provider(Arc::clone(&transport));
    transport.clear_calls();

    provider.request("eth_accounts", json!([])).expect("accounts");
    provider
        .request("personal_sign", json!(["0x01", ADDRESS_A]))
        .expect("personal_sign");

    let methods: Vec<String> = transport
        .calls()
        .into_iter()
        .map(|c| c.method)
        .filter(|m| m != "eth_blockNumber")
        .collect();
    assert_eq!(methods, Vec::<String>::new());
    provider
        .request("eth_chainId", json!([]))
        .expect("chain id");
    assert_eq!(transport.calls_of("eth_chainId").len(), 1);
}
