use serde::{Deserialize, Serialize};

use crate::domain::SecretType;

pub const DEFAULT_SERVICE_DOMAIN: &str = "arkane.network";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub endpoint_http_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_ws_url: Option<String>,
}

impl ConnectionDetails {
    /// Node endpoint for `secret_type`, e.g. `https://ethereum-node-staging.arkane.network`.
    pub fn derive(secret_type: SecretType, environment: &str, domain: &str) -> Self {
        let host = format!("{}-node", secret_type.as_str().to_ascii_lowercase());
        Self {
            endpoint_http_url: service_url(&host, environment, domain),
            endpoint_ws_url: None,
        }
    }
}

/// Environment part of a host name: `-local` is dropped, production has none.
pub fn environment_segment(environment: &str) -> Option<String> {
    let environment = environment.trim().replacen("-local", "", 1);
    if environment.is_empty() || environment.starts_with("prod") {
        None
    } else {
        Some(environment)
    }
}

/// `https://<host>[-<environment>].<domain>`
pub fn service_url(host: &str, environment: &str, domain: &str) -> String {
    match environment_segment(environment) {
        Some(env) => format!("https://{host}-{env}.{domain}"),
        None => format!("https://{host}.{domain}"),
    }
}
