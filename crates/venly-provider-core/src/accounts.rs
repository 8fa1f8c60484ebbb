use alloy::primitives::Address;

use crate::domain::{SecretType, Wallet};

/// Locally cached wallet list of the authenticated user for one secret type.
#[derive(Debug, Clone, Default)]
pub struct WalletCache {
    secret_type: Option<SecretType>,
    wallets: Vec<Wallet>,
    fetched_at_ms: Option<u64>,
}

impl WalletCache {
    /// Replaces the cache with the wallets of `secret_type` found in `wallets`.
    pub fn refresh(&mut self, secret_type: SecretType, wallets: Vec<Wallet>, now_ms: u64) {
        self.wallets = wallets
            .into_iter()
            .filter(|w| w.secret_type == secret_type)
            .collect();
        self.secret_type = Some(secret_type);
        self.fetched_at_ms = Some(now_ms);
    }

    pub fn accounts(&self) -> Vec<String> {
        self.wallets.iter().map(|w| w.address.clone()).collect()
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    pub fn secret_type(&self) -> Option<SecretType> {
        self.secret_type
    }

    /// Wallet id for `address`, or an empty string when no cached wallet matches.
    pub fn resolve_wallet_id(&self, address: &str) -> String {
        self.wallets
            .iter()
            .find(|w| same_address(&w.address, address))
            .map(|w| w.id.clone())
            .unwrap_or_default()
    }

    pub fn fetched_at_ms(&self) -> Option<u64> {
        self.fetched_at_ms
    }

    pub fn is_stale(&self, now_ms: u64, max_age_ms: u64) -> bool {
        match self.fetched_at_ms {
            Some(at) => now_ms.saturating_sub(at) >= max_age_ms,
            None => true,
        }
    }

    /// Forces the next read to refetch; cached wallets stay readable meanwhile.
    pub fn invalidate(&mut self) {
        self.fetched_at_ms = None;
    }

    /// Drops every cached wallet, e.g. once they belong to another secret type.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// Checksummed and lowercase spellings of one address are the same account.
fn same_address(a: &str, b: &str) -> bool {
    match (a.parse::<Address>(), b.parse::<Address>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
