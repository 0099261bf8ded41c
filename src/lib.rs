pub mod core;
pub mod exchanges;
pub mod orchestrator;
pub mod utils;

pub use crate::core::{
    config::{Credentials, ExchangeConfig},
    errors::ExchangeError,
    registry::{ExchangeBundle, ExchangeRegistry, RegistryBuilder},
    traits::{
        AccountInfo, BalanceOperations, ExchangeConnector, MarketDataSource, MarketOperations,
        OrderPlacer, TradingOperations,
    },
    types::*,
};
pub use orchestrator::{Orchestrator, ReadService};
pub use utils::ExchangeFactory;
