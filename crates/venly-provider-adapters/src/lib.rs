pub mod auth;
pub mod clock;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod memory;
pub mod middleware;
pub mod provider;
pub mod transport;

pub use auth::{AuthorizationFlow, PopupAuthorizationFlow};
pub use clock::SystemClockAdapter;
pub use config::{BearerTokenProvider, ProviderConfig};
pub use engine::{BlockTracker, EngineState, Middleware, Next, ProviderEngine};
pub use gateway::HttpSigningGateway;
pub use memory::InMemoryGateway;
pub use provider::{TransportFactory, VenlyProvider};
pub use transport::HttpTransport;
