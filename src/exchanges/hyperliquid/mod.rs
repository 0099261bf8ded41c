pub mod builder;
pub mod connector;
pub mod conversions;
pub mod rest;
pub mod signer;
pub mod types;

// Re-export main types for easier importing
pub use builder::{build_connector, HyperliquidBuilder};
pub use connector::HyperliquidConnector;
pub use rest::HyperliquidRest;
pub use signer::HyperliquidSigner;
pub use types::{Action, ExchangeResponse, ExchangeStatus, HyperliquidError};
