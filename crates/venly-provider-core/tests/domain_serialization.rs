use venly_provider_core::{
    JsonRpcResponse, ProviderError, RawSignatureRequest, RpcError, SecretType,
    SignatureRequest, SigningResult, SigningStatus, Wallet,
};

#[test]
fn wallet_round_trips_camel_case_fields() {
    let wallet: Wallet = serde_json::from_value(serde_json::json!({
        "id": "w-1",
        "address": "0x1000000000000000000000000000000000000001",
        "secretType": "ETHEREUM",
        "walletType": "WHITE_LABEL"
    }))
    .expect("decode wallet");
    assert_eq!(wallet.secret_type, SecretType::Ethereum);

    let unknown: Wallet = serde_json::from_value(serde_json::json!({
        "id": "w-2",
        "address": "bc1qxyz",
        "secretType": "BITCOIN"
    }))
    .expect("decode foreign wallet");
    assert_eq!(unknown.secret_type, SecretType::Unsupported);
}

#[test]
fn raw_request_wire_shape() {
    let request = SignatureRequest::Raw(RawSignatureRequest {
        request_type: SecretType::Ethereum.raw_request_type(),
        wallet_id: "w-1".to_owned(),
        data: "0xdeadbeef".to_owned(),
    });
    assert_eq!(
        serde_json::to_value(&request).expect("encode"),
        serde_json::json!({"type": "ETHEREUM_RAW", "walletId": "w-1", "data": "0xdeadbeef"})
    );
    assert_eq!(request.wallet_id(), "w-1");
}

#[test]
fn signing_result_decodes_status_and_errors() {
    let result: SigningResult = serde_json::from_value(serde_json::json!({
        "status": "FAILURE",
        "errors": ["a", "b"]
    }))
    .expect("decode");
    assert_eq!(result.status, SigningStatus::Failure);
    assert_eq!(result.errors, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn provider_errors_map_onto_rpc_codes() {
    let cases = [
        (ProviderError::Authentication("x".to_owned()), 4100),
        (ProviderError::NotImplemented("typed data signing"), 4200),
        (ProviderError::Validation("x".to_owned()), -32602),
        (ProviderError::SigningFailure("x".to_owned()), -32603),
        (ProviderError::Transport("x".to_owned()), -32603),
    ];
    for (err, code) in cases {
        assert_eq!(RpcError::from(&err).code, code, "{err}");
    }

    let upstream = RpcError::new(-32000, "nonce too low");
    let response = JsonRpcResponse::from_outcome(
        serde_json::json!(7),
        Err(ProviderError::Rpc(upstream.clone())),
    );
    assert_eq!(response.error, Some(upstream));
    assert_eq!(response.id, serde_json::json!(7));
}

#[test]
fn secret_type_parses_case_insensitively() {
    assert_eq!("ethereum".parse::<SecretType>().expect("parse"), SecretType::Ethereum);
    assert_eq!("Matic".parse::<SecretType>().expect("parse"), SecretType::Matic);
    assert!("tron".parse::<SecretType>().is_err());
}
