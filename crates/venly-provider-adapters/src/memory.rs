use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::keccak256;

use venly_provider_core::{
    AuthenticationOptions, AuthenticationResult, Profile, ProviderError, SecretType,
    SignatureRequest, SigningGateway, SigningResult, Wallet,
};

/// Deterministic signing gateway kept entirely in memory.
///
/// Scripted results are answered in order; without one, known wallets get a
/// keccak-derived signature and unknown wallet ids a FAILURE. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    authenticated: bool,
    profile: Option<Profile>,
    wallets: Vec<Wallet>,
    scripted: VecDeque<SigningResult>,
    submitted: Vec<SignatureRequest>,
    wallet_fetches: usize,
    logins: usize,
    fail_next_wallet_fetch: Option<ProviderError>,
}

impl InMemoryState {
    // Stands in for the popup login; a live session is reused.
    fn log_in(&mut self) {
        if !self.authenticated {
            self.authenticated = true;
            self.profile = Some(default_profile());
            self.logins += 1;
        }
    }
}

impl InMemoryGateway {
    pub fn with_wallets(wallets: Vec<Wallet>) -> Self {
        let gateway = Self::default();
        if let Ok(mut g) = gateway.inner.lock() {
            g.wallets = wallets;
        }
        gateway
    }

    fn state(&self) -> Result<MutexGuard<'_, InMemoryState>, ProviderError> {
        self.inner
            .lock()
            .map_err(|e| ProviderError::Transport(format!("gateway lock poisoned: {e}")))
    }

    pub fn set_authenticated(&self, authenticated: bool) -> Result<(), ProviderError> {
        let mut g = self.state()?;
        g.authenticated = authenticated;
        g.profile = authenticated.then(default_profile);
        Ok(())
    }

    pub fn set_wallets(&self, wallets: Vec<Wallet>) -> Result<(), ProviderError> {
        self.state()?.wallets = wallets;
        Ok(())
    }

    pub fn push_result(&self, result: SigningResult) -> Result<(), ProviderError> {
        self.state()?.scripted.push_back(result);
        Ok(())
    }

    pub fn fail_next_wallet_fetch(&self, err: ProviderError) -> Result<(), ProviderError> {
        self.state()?.fail_next_wallet_fetch = Some(err);
        Ok(())
    }

    pub fn submitted_requests(&self) -> Result<Vec<SignatureRequest>, ProviderError> {
        Ok(self.state()?.submitted.clone())
    }

    pub fn wallet_fetch_count(&self) -> Result<usize, ProviderError> {
        Ok(self.state()?.wallet_fetches)
    }

    /// Number of completed interactive logins.
    pub fn login_count(&self) -> Result<usize, ProviderError> {
        Ok(self.state()?.logins)
    }
}

impl SigningGateway for InMemoryGateway {
    fn check_authenticated(&self) -> Result<AuthenticationResult, ProviderError> {
        let g = self.state()?;
        Ok(AuthenticationResult {
            is_authenticated: g.authenticated,
            profile: g.profile.clone(),
        })
    }

    fn authenticate(
        &self,
        _options: &AuthenticationOptions,
    ) -> Result<AuthenticationResult, ProviderError> {
        let mut g = self.state()?;
        g.log_in();
        Ok(AuthenticationResult {
            is_authenticated: true,
            profile: g.profile.clone(),
        })
    }

    fn list_wallets(&self, secret_type: SecretType) -> Result<Vec<Wallet>, ProviderError> {
        let mut g = self.state()?;
        if !g.authenticated {
            return Err(ProviderError::Authentication(
                "no authenticated session".to_owned(),
            ));
        }
        if let Some(err) = g.fail_next_wallet_fetch.take() {
            return Err(err);
        }
        g.wallet_fetches += 1;
        Ok(g.wallets
            .iter()
            .filter(|w| w.secret_type == secret_type)
            .cloned()
            .collect())
    }

    fn request_signature(
        &self,
        request: &SignatureRequest,
    ) -> Result<SigningResult, ProviderError> {
        let mut g = self.state()?;
        g.log_in();
        g.submitted.push(request.clone());
        if let Some(result) = g.scripted.pop_front() {
            return Ok(result);
        }
        if !g.wallets.iter().any(|w| w.id == request.wallet_id()) {
            return Ok(SigningResult::failure([format!(
                "wallet {:?} not found",
                request.wallet_id()
            )]));
        }
        Ok(deterministic_result(request))
    }
}

fn default_profile() -> Profile {
    Profile {
        user_id: "in-memory-user".to_owned(),
        email: None,
        first_name: None,
        last_name: None,
    }
}

fn deterministic_result(request: &SignatureRequest) -> SigningResult {
    match request {
        SignatureRequest::Transaction(tx) => {
            let seed = format!("{}:{:?}:{}:{}", tx.wallet_id, tx.nonce, tx.data, tx.value);
            let signed = keccak256(seed.as_bytes());
            SigningResult::success(serde_json::json!({
                "type": tx.request_type,
                "signedTransaction": format!("0x{}", alloy::hex::encode(signed)),
            }))
        }
        SignatureRequest::Raw(raw) => {
            let r = keccak256(raw.data.as_bytes());
            let s = keccak256(raw.wallet_id.as_bytes());
            SigningResult::success(serde_json::json!({
                "type": raw.request_type,
                "r": alloy::hex::encode(r),
                "s": alloy::hex::encode(s),
                "v": 27,
            }))
        }
    }
}
