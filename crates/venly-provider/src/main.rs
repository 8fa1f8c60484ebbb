//! venly-provider: run JSON-RPC requests through a Venly-backed provider chain

use std::collections::HashMap;

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use serde_json::Value;

use venly_provider_adapters::{HttpSigningGateway, ProviderConfig, VenlyProvider};

#[derive(Parser)]
#[command(name = "venly-provider")]
#[command(about = "JSON-RPC provider backed by the Venly signing service", long_about = None)]
struct Cli {
    /// Application client id registered with the signing service
    #[arg(long, env = "VENLY_CLIENT_ID")]
    client_id: Option<String>,

    /// Service environment (staging, qa, prod, ...)
    #[arg(short, long, env = "VENLY_ENVIRONMENT")]
    environment: Option<String>,

    /// Chain whose wallets are used (ETHEREUM, MATIC, BSC, ...)
    #[arg(short, long, env = "VENLY_SECRET_TYPE")]
    secret_type: Option<String>,

    /// Build the chain without loading accounts
    #[arg(long)]
    skip_authentication: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node endpoint derived from the configuration
    Endpoint,
    /// Log in and print the profile and wallets
    Login,
    /// List wallet addresses
    Accounts,
    /// Send a JSON-RPC request through the provider chain
    Call {
        method: String,
        /// Positional params as a JSON array
        #[arg(default_value = "[]")]
        params: String,
    },
}

impl Cli {
    // Flags win over `VENLY_*` variables.
    fn config(&self) -> eyre::Result<ProviderConfig> {
        let mut overrides = HashMap::new();
        if let Some(client_id) = &self.client_id {
            overrides.insert("VENLY_CLIENT_ID", client_id.clone());
        }
        if let Some(environment) = &self.environment {
            overrides.insert("VENLY_ENVIRONMENT", environment.clone());
        }
        if let Some(secret_type) = &self.secret_type {
            overrides.insert("VENLY_SECRET_TYPE", secret_type.clone());
        }
        if self.skip_authentication {
            overrides.insert("VENLY_SKIP_AUTHENTICATION", "true".to_owned());
        }
        let cfg = ProviderConfig::from_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
        .wrap_err("invalid provider configuration")?;
        Ok(cfg)
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = cli.config()?;

    if let Commands::Endpoint = cli.command {
        let details = cfg.connection_details();
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }
    if let Commands::Login = cli.command {
        cfg.skip_authentication = true;
    }

    let gateway = HttpSigningGateway::with_config(&cfg)?;
    let mut provider = VenlyProvider::new(gateway);
    tracing::info!(
        secret_type = %cfg.secret_type,
        environment = %cfg.environment,
        "building provider chain"
    );
    provider
        .create_provider_engine(cfg)
        .wrap_err("failed to start provider chain")?;

    let result = match &cli.command {
        Commands::Endpoint => Value::Null,
        Commands::Login => serde_json::to_value(provider.authenticate(None)?)?,
        Commands::Accounts => provider.request("eth_accounts", Value::Array(Vec::new()))?,
        Commands::Call { method, params } => {
            let params: Value = serde_json::from_str(params)
                .wrap_err_with(|| format!("params for {method} are not valid JSON"))?;
            if !params.is_array() {
                eyre::bail!("params for {method} must be a JSON array");
            }
            provider.request(method, params)?
        }
    };
    provider.stop();

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
