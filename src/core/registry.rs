//! Immutable `(exchange, trading type) → bundle` lookup.
//!
//! Built once at startup with [`RegistryBuilder`]; the resulting
//! [`ExchangeRegistry`] has no mutating methods and is shared as
//! `Arc<ExchangeRegistry>` across request handlers without locks.

use crate::core::errors::ExchangeError;
use crate::core::traits::{
    BalanceOperations, ExchangeConnector, MarketOperations, TradingOperations,
};
use crate::core::types::{ExchangeId, TradingType};
use crate::orchestrator::{Orchestrator, ReadService};
use std::collections::HashMap;
use std::sync::Arc;

/// The three surfaces served for one registered pair
#[derive(Clone)]
pub struct ExchangeBundle {
    pub trading: Arc<dyn TradingOperations>,
    pub balance: Arc<dyn BalanceOperations>,
    pub market: Arc<dyn MarketOperations>,
}

impl std::fmt::Debug for ExchangeBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeBundle").finish_non_exhaustive()
    }
}

impl ExchangeBundle {
    /// Wire an orchestrator and read service around one shared connector
    pub fn from_connector<C>(connector: C) -> Self
    where
        C: ExchangeConnector + 'static,
    {
        let connector = Arc::new(connector);
        let reads = Arc::new(ReadService::new(Arc::clone(&connector)));
        Self {
            trading: Arc::new(Orchestrator::new(connector)),
            balance: reads.clone(),
            market: reads,
        }
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<(ExchangeId, TradingType), ExchangeBundle>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        exchange: ExchangeId,
        trading_type: TradingType,
        bundle: ExchangeBundle,
    ) -> Result<Self, ExchangeError> {
        if self.entries.contains_key(&(exchange, trading_type)) {
            return Err(ExchangeError::InvalidParameters(format!(
                "{} {} is already registered",
                exchange, trading_type
            )));
        }
        self.entries.insert((exchange, trading_type), bundle);
        Ok(self)
    }

    pub fn build(self) -> ExchangeRegistry {
        ExchangeRegistry {
            entries: self.entries,
        }
    }
}

pub struct ExchangeRegistry {
    entries: HashMap<(ExchangeId, TradingType), ExchangeBundle>,
}

impl std::fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

impl ExchangeRegistry {
    pub fn resolve(
        &self,
        exchange: ExchangeId,
        trading_type: TradingType,
    ) -> Result<&ExchangeBundle, ExchangeError> {
        self.entries
            .get(&(exchange, trading_type))
            .ok_or_else(|| {
                ExchangeError::NotFound(format!(
                    "No implementation registered for {} {}",
                    exchange, trading_type
                ))
            })
    }

    /// Registered pairs, sorted for stable output
    pub fn registered(&self) -> Vec<(ExchangeId, TradingType)> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort_by_key(|(exchange, trading_type)| (exchange.to_string(), trading_type.to_string()));
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        AssetMetadata, Balance, OpenOrder, OrderAck, OrderParameters, OrderStatus, Position,
    };
    use crate::core::traits::{AccountInfo, MarketDataSource, OrderPlacer};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct StaticVenue;

    #[async_trait]
    impl MarketDataSource for StaticVenue {
        async fn get_current_price(&self, _instrument: &str) -> Result<Decimal, ExchangeError> {
            Ok(dec!(100))
        }

        async fn get_asset_metadata(
            &self,
            instrument: &str,
        ) -> Result<AssetMetadata, ExchangeError> {
            Ok(AssetMetadata {
                instrument: instrument.to_string(),
                size_decimals: 3,
                price_decimals: 2,
                price_significant_figures: None,
                max_leverage: 20,
                isolated_only: false,
            })
        }
    }

    #[async_trait]
    impl OrderPlacer for StaticVenue {
        async fn place_order(&self, order: OrderParameters) -> Result<OrderAck, ExchangeError> {
            Ok(OrderAck {
                order_id: "1".to_string(),
                instrument: order.instrument,
                status: OrderStatus::Resting,
            })
        }

        async fn cancel_order(&self, _: &str, _: &str) -> Result<(), ExchangeError> {
            Ok(())
        }

        async fn cancel_all_orders(&self, _: Option<&str>) -> Result<usize, ExchangeError> {
            Ok(0)
        }

        async fn set_leverage(&self, _: &str, _: u32, _: bool) -> Result<(), ExchangeError> {
            Ok(())
        }
    }

    #[async_trait]
    impl AccountInfo for StaticVenue {
        async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
            Ok(Vec::new())
        }

        async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
            Ok(Vec::new())
        }

        async fn get_open_orders(&self, _: Option<&str>) -> Result<Vec<OpenOrder>, ExchangeError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_resolve_registered_pair() {
        let registry = RegistryBuilder::new()
            .register(
                ExchangeId::Hyperliquid,
                TradingType::Perpetual,
                ExchangeBundle::from_connector(StaticVenue),
            )
            .unwrap()
            .build();

        let bundle = registry
            .resolve(ExchangeId::Hyperliquid, TradingType::Perpetual)
            .unwrap();
        let price = bundle.market.get_current_price("BTC").await;
        assert_eq!(price.data, Some(dec!(100)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregistered_pair_is_not_found() {
        let registry = RegistryBuilder::new()
            .register(
                ExchangeId::Binance,
                TradingType::Perpetual,
                ExchangeBundle::from_connector(StaticVenue),
            )
            .unwrap()
            .build();

        assert!(matches!(
            registry.resolve(ExchangeId::Binance, TradingType::Spot),
            Err(ExchangeError::NotFound(_))
        ));
        assert!(matches!(
            registry.resolve(ExchangeId::Aster, TradingType::Perpetual),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = RegistryBuilder::new()
            .register(
                ExchangeId::Aster,
                TradingType::Perpetual,
                ExchangeBundle::from_connector(StaticVenue),
            )
            .unwrap()
            .register(
                ExchangeId::Aster,
                TradingType::Perpetual,
                ExchangeBundle::from_connector(StaticVenue),
            );
        assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<ExchangeRegistry>>();
    }
}
