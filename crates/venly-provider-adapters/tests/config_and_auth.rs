use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use venly_provider_adapters::{AuthorizationFlow, PopupAuthorizationFlow, ProviderConfig};
use venly_provider_core::{ProviderError, SecretType, WindowMode};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let cfg = ProviderConfig::new("client");

    assert_eq!(cfg.environment, "staging");
    assert_eq!(cfg.secret_type, SecretType::Ethereum);
    assert_eq!(cfg.polling_interval_ms, 15_000);
    assert_eq!(cfg.wallet_refresh_interval_ms, 60_000);
    assert_eq!(cfg.window_mode, WindowMode::Popup);
    assert!(!cfg.skip_authentication);
    assert_eq!(cfg.api_base_url(), "https://api-staging.arkane.network");
    assert_eq!(cfg.connect_base_url(), "https://connect-staging.arkane.network");
    assert_eq!(
        cfg.connection_details().endpoint_http_url,
        "https://ethereum-node-staging.arkane.network"
    );
    cfg.validate().expect("defaults are valid");
}

#[test]
fn env_lookup_overrides_defaults() {
    let cfg = ProviderConfig::from_lookup(lookup(&[
        ("VENLY_CLIENT_ID", "my-app"),
        ("VENLY_ENVIRONMENT", "prod"),
        ("VENLY_SECRET_TYPE", "matic"),
        ("VENLY_WINDOW_MODE", "redirect"),
        ("VENLY_SKIP_AUTHENTICATION", "true"),
        ("VENLY_POLLING_INTERVAL_MS", "4000"),
        ("VENLY_SERVICE_DOMAIN", "venly.io"),
        ("VENLY_BEARER_TOKEN", "tok"),
    ]))
    .expect("config");

    assert_eq!(cfg.client_id, "my-app");
    assert_eq!(cfg.secret_type, SecretType::Matic);
    assert_eq!(cfg.window_mode, WindowMode::Redirect);
    assert!(cfg.skip_authentication);
    assert_eq!(cfg.polling_interval_ms, 4_000);
    assert_eq!(
        cfg.connection_details().endpoint_http_url,
        "https://matic-node.venly.io"
    );
    let token = cfg.bearer_token_provider.as_ref().expect("token provider");
    assert_eq!(token().as_deref(), Some("tok"));
}

#[test]
fn env_lookup_rejects_missing_or_invalid_values() {
    let err = ProviderConfig::from_lookup(lookup(&[])).expect_err("no client id");
    assert!(matches!(err, ProviderError::Validation(_)));

    let err = ProviderConfig::from_lookup(lookup(&[
        ("VENLY_CLIENT_ID", "my-app"),
        ("VENLY_SECRET_TYPE", "bitcoin"),
    ]))
    .expect_err("unsupported secret type");
    assert!(matches!(err, ProviderError::Validation(_)));

    let err = ProviderConfig::from_lookup(lookup(&[
        ("VENLY_CLIENT_ID", "my-app"),
        ("VENLY_POLLING_INTERVAL_MS", "0"),
    ]))
    .expect_err("zero polling interval");
    assert!(matches!(err, ProviderError::Validation(_)));
}

#[test]
fn popup_flow_opens_login_and_waits_for_token() {
    let polls = Arc::new(AtomicUsize::new(0));
    let opened = Arc::new(Mutex::new(Vec::new()));

    let mut cfg = ProviderConfig::new("client");
    cfg.auth_poll_interval_ms = 1;
    let counter = Arc::clone(&polls);
    cfg.bearer_token_provider = Some(Arc::new(move || {
        (counter.fetch_add(1, Ordering::SeqCst) >= 3).then(|| "late-token".to_owned())
    }));
    let seen = Arc::clone(&opened);
    let flow = PopupAuthorizationFlow::with_config(&cfg).with_opener(Arc::new(
        move |url: &str| -> std::io::Result<()> {
            seen.lock().expect("opened lock").push(url.to_owned());
            Ok(())
        },
    ));

    let token = flow
        .authorize("https://connect-staging.arkane.network/auth/login?clientId=client")
        .expect("token");

    assert_eq!(token, "late-token");
    assert_eq!(opened.lock().expect("opened lock").len(), 1);
    assert!(polls.load(Ordering::SeqCst) >= 4);
}

#[test]
fn redirect_flow_and_missing_token_source_fail_authentication() {
    let opened = Arc::new(AtomicUsize::new(0));
    let mut cfg = ProviderConfig::new("client");
    cfg.window_mode = WindowMode::Redirect;
    cfg.bearer_token_provider = Some(Arc::new(|| None::<String>));
    let count = Arc::clone(&opened);
    let flow = PopupAuthorizationFlow::with_config(&cfg).with_opener(Arc::new(
        move |_: &str| -> std::io::Result<()> {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    ));

    let err = flow.authorize("https://login").expect_err("redirect");
    assert!(matches!(err, ProviderError::Authentication(_)));
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    let no_tokens = PopupAuthorizationFlow::with_config(&ProviderConfig::new("client"))
        .with_opener(Arc::new(|_: &str| -> std::io::Result<()> { Ok(()) }));
    let err = no_tokens.authorize("https://login").expect_err("no token source");
    assert!(matches!(err, ProviderError::Authentication(_)));
}
