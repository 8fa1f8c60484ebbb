use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use venly_provider_core::{
    AuthenticationOptions, AuthenticationResult, Profile, ProviderError, SecretType,
    SignatureRequest, SigningGateway, SigningResult, Wallet,
};

use crate::auth::{AuthorizationFlow, PopupAuthorizationFlow};
use crate::config::{BearerTokenProvider, ProviderConfig};

/// Signing service reached over its REST API with a bearer-token session.
#[derive(Clone)]
pub struct HttpSigningGateway {
    api_base_url: String,
    connect_base_url: String,
    client_id: String,
    default_options: AuthenticationOptions,
    client: reqwest::blocking::Client,
    tokens: Option<BearerTokenProvider>,
    flow: Arc<dyn AuthorizationFlow>,
    session: Arc<Mutex<Option<String>>>,
}

impl HttpSigningGateway {
    pub fn with_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProviderError::Transport(format!("failed to build signing api client: {e}"))
            })?;
        Ok(Self {
            api_base_url: config.api_base_url(),
            connect_base_url: config.connect_base_url(),
            client_id: config.client_id.clone(),
            default_options: config.authentication_options.clone(),
            client,
            tokens: config.bearer_token_provider.clone(),
            flow: Arc::new(PopupAuthorizationFlow::with_config(config)),
            session: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_authorization_flow(mut self, flow: Arc<dyn AuthorizationFlow>) -> Self {
        self.flow = flow;
        self
    }

    /// Points the gateway at a different API host (self-hosted or test servers).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn login_url(&self, options: &AuthenticationOptions) -> Result<String, ProviderError> {
        let mut params = vec![("clientId", self.client_id.clone())];
        if let Some(hint) = &options.idp_hint {
            params.push(("idpHint", hint.clone()));
        }
        if let Some(uri) = &options.redirect_uri {
            params.push(("redirectUri", uri.clone()));
        }
        let url = reqwest::Url::parse_with_params(
            &format!("{}/auth/login", self.connect_base_url),
            &params,
        )
        .map_err(|e| ProviderError::Validation(format!("invalid login url: {e}")))?;
        Ok(url.to_string())
    }

    fn current_token(&self) -> Result<Option<String>, ProviderError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| ProviderError::Transport(format!("session lock poisoned: {e}")))?;
        if session.is_none() {
            *session = self.tokens.as_ref().and_then(|t| t());
        }
        Ok(session.clone())
    }

    fn store_token(&self, token: Option<String>) -> Result<(), ProviderError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| ProviderError::Transport(format!("session lock poisoned: {e}")))?;
        *session = token;
        Ok(())
    }

    /// Existing session token, or the token of a freshly completed login.
    fn authorized_token(&self, options: &AuthenticationOptions) -> Result<String, ProviderError> {
        if let Some(token) = self.current_token()? {
            return Ok(token);
        }
        let token = self.flow.authorize(&self.login_url(options)?)?;
        self.store_token(Some(token.clone()))?;
        Ok(token)
    }

    fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value), ProviderError> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .map_err(|e| ProviderError::Transport(format!("GET {path} failed: {e}")))?;
        decode_response(path, response)
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<(StatusCode, Value), ProviderError> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .map_err(|e| ProviderError::Transport(format!("POST {path} failed: {e}")))?;
        decode_response(path, response)
    }

    fn session_rejected(&self, status: StatusCode) -> Result<bool, ProviderError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.store_token(None)?;
            return Ok(true);
        }
        Ok(false)
    }
}

impl SigningGateway for HttpSigningGateway {
    fn check_authenticated(&self) -> Result<AuthenticationResult, ProviderError> {
        let Some(token) = self.current_token()? else {
            return Ok(AuthenticationResult::unauthenticated());
        };
        let (status, body) = self.get("/api/profile", &token)?;
        if self.session_rejected(status)? {
            return Ok(AuthenticationResult::unauthenticated());
        }
        let result = api_result("/api/profile", status, body)?.map_err(|errors| {
            ProviderError::Transport(format!("/api/profile: {}", errors.join(", ")))
        })?;
        let profile: Profile = serde_json::from_value(result)
            .map_err(|e| ProviderError::Validation(format!("invalid profile: {e}")))?;
        Ok(AuthenticationResult {
            is_authenticated: true,
            profile: Some(profile),
        })
    }

    fn authenticate(
        &self,
        options: &AuthenticationOptions,
    ) -> Result<AuthenticationResult, ProviderError> {
        let current = self.check_authenticated()?;
        if current.is_authenticated {
            return Ok(current);
        }
        let token = self.flow.authorize(&self.login_url(options)?)?;
        self.store_token(Some(token))?;
        let result = self.check_authenticated()?;
        if !result.is_authenticated {
            return Err(ProviderError::Authentication(
                "login did not produce a valid session".to_owned(),
            ));
        }
        Ok(result)
    }

    fn list_wallets(&self, secret_type: SecretType) -> Result<Vec<Wallet>, ProviderError> {
        let token = self.current_token()?.ok_or_else(|| {
            ProviderError::Authentication("no authenticated session".to_owned())
        })?;
        let path = format!("/api/wallets?secretType={secret_type}");
        let (status, body) = self.get(&path, &token)?;
        if self.session_rejected(status)? {
            return Err(ProviderError::Authentication(
                "session rejected while listing wallets".to_owned(),
            ));
        }
        let result = api_result(&path, status, body)?.map_err(|errors| {
            ProviderError::Transport(format!("{path}: {}", errors.join(", ")))
        })?;
        let wallets: Vec<Wallet> = serde_json::from_value(result)
            .map_err(|e| ProviderError::Validation(format!("invalid wallet list: {e}")))?;
        Ok(wallets
            .into_iter()
            .filter(|w| w.secret_type == secret_type)
            .collect())
    }

    fn request_signature(
        &self,
        request: &SignatureRequest,
    ) -> Result<SigningResult, ProviderError> {
        let token = self.authorized_token(&self.default_options)?;
        let body = SignatureEnvelope {
            signature_request: request,
        };
        tracing::debug!(
            request_type = request.request_type(),
            wallet_id = request.wallet_id(),
            "submitting signature request"
        );
        let (status, body) = self.post("/api/signatures", &token, &body)?;
        if self.session_rejected(status)? {
            return Err(ProviderError::Authentication(
                "session rejected while signing".to_owned(),
            ));
        }
        Ok(match api_result("/api/signatures", status, body)? {
            Ok(result) => SigningResult::success(result),
            Err(errors) => SigningResult::failure(errors),
        })
    }
}

// Serialized straight into the request body; wei amounts can exceed what a `Value` holds.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureEnvelope<'a> {
    signature_request: &'a SignatureRequest,
}

fn decode_response(
    path: &str,
    response: reqwest::blocking::Response,
) -> Result<(StatusCode, Value), ProviderError> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| ProviderError::Transport(format!("{path}: failed to read body: {e}")))?;
    if text.trim().is_empty() {
        return Ok((status, Value::Null));
    }
    let body = serde_json::from_str(&text)
        .map_err(|e| ProviderError::Transport(format!("{path}: json decode failed: {e}")))?;
    Ok((status, body))
}

/// Unwraps the `{success, result, errors}` envelope of the signing API.
/// The inner `Err` carries the service's error messages; envelopes without
/// any are transport errors.
fn api_result(
    path: &str,
    status: StatusCode,
    body: Value,
) -> Result<Result<Value, Vec<String>>, ProviderError> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if success && status.is_success() {
        return Ok(Ok(body.get("result").cloned().unwrap_or(Value::Null)));
    }
    let errors = error_messages(&body);
    if errors.is_empty() {
        return Err(ProviderError::Transport(format!(
            "{path}: status {status}: {body}"
        )));
    }
    Ok(Err(errors))
}

fn error_messages(body: &Value) -> Vec<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                        .unwrap_or_else(|| other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default()
}
