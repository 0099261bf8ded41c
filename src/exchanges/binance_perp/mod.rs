// Core modules - one responsibility per file
pub mod conversions; // String ↔︎ Decimal, wire parameters
pub mod rest; // thin typed wrapper around RestClient
pub mod types; // serde structs ← raw JSON

pub mod builder;
pub mod connector; // compose sub-traits

pub use builder::build_connector;
pub use connector::BinancePerpConnector;
pub use rest::{BinancePerpRestClient, FuturesEndpoints};
pub use types::BinancePerpError;
