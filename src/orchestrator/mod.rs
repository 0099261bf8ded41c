//! Multi-step trade workflows over a single venue connector.
//!
//! The orchestrator works in exact decimals throughout. It reads price and
//! metadata fresh on every call, rounds with the instrument's rules, and hands
//! fully resolved [`OrderParameters`] to the connector, which renders them to
//! wire strings immediately before signing.

pub mod close;
pub mod quick_trade;

use crate::core::errors::ExchangeError;
use crate::core::traits::{
    BalanceOperations, ExchangeConnector, MarketOperations, TradingOperations,
};
use crate::core::types::{
    AssetMetadata, Balance, CancelAck, CancelAllAck, ClosePositionRequest, CloseAllResult,
    LeverageAck, LimitOrderRequest, MarketOrderRequest, OpenOrder, OrderAck, OrderKind,
    OrderParameters, OrderSide, Position, QuickTradeRequest, QuickTradeResult, ResultEnvelope,
    TimeInForce, TriggerOrderRequest,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Slippage allowance applied to marketable IOC orders when the caller gives none (5%)
pub const DEFAULT_SLIPPAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
pub const MIN_LEVERAGE: u32 = 1;
pub const MAX_LEVERAGE: u32 = 50;

pub(crate) fn validate_leverage(leverage: u32) -> Result<(), ExchangeError> {
    if (MIN_LEVERAGE..=MAX_LEVERAGE).contains(&leverage) {
        Ok(())
    } else {
        Err(ExchangeError::InvalidParameters(format!(
            "Leverage must be between {} and {}, got {}",
            MIN_LEVERAGE, MAX_LEVERAGE, leverage
        )))
    }
}

pub(crate) fn resolve_slippage(slippage: Option<Decimal>) -> Result<Decimal, ExchangeError> {
    let slippage = slippage.unwrap_or(DEFAULT_SLIPPAGE);
    if slippage.is_sign_negative() || slippage >= Decimal::ONE {
        return Err(ExchangeError::InvalidParameters(format!(
            "Slippage must be in [0, 1), got {}",
            slippage
        )));
    }
    Ok(slippage)
}

/// Worst acceptable fill price for an order on `side`
pub fn slipped_price(price: Decimal, side: OrderSide, slippage: Decimal) -> Decimal {
    match side {
        OrderSide::Buy => price * (Decimal::ONE + slippage),
        OrderSide::Sell => price * (Decimal::ONE - slippage),
    }
}

fn require_positive(name: &str, value: Decimal) -> Result<(), ExchangeError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ExchangeError::InvalidParameters(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

/// Trading surface for one venue
pub struct Orchestrator<C> {
    connector: Arc<C>,
}

impl<C: ExchangeConnector> Orchestrator<C> {
    pub fn new(connector: Arc<C>) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Any failure to obtain a usable price becomes `PriceUnavailable`
    pub(crate) async fn fetch_price(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        match self.connector.get_current_price(instrument).await {
            Ok(price) if price > Decimal::ZERO => Ok(price),
            Ok(price) => Err(ExchangeError::price_unavailable(
                instrument,
                format!("non-positive price {}", price),
            )),
            Err(e) => Err(ExchangeError::price_unavailable(instrument, e.to_string())),
        }
    }

    /// Reduce-or-open IOC order capped at the slippage price around the current price
    pub(crate) async fn market_order(
        &self,
        instrument: &str,
        side: OrderSide,
        size: Decimal,
        slippage: Decimal,
        reduce_only: bool,
    ) -> Result<OrderAck, ExchangeError> {
        let price = self.fetch_price(instrument).await?;
        let metadata = self.connector.get_asset_metadata(instrument).await?;
        let size = metadata.round_size(size);
        if size.is_zero() {
            return Err(ExchangeError::InvalidParameters(format!(
                "Order size rounds to zero at {} decimals",
                metadata.size_decimals
            )));
        }
        let limit = metadata.round_price(slipped_price(price, side, slippage));
        debug!(%price, %limit, %size, "Submitting IOC order");

        self.connector
            .place_order(
                OrderParameters::market(instrument, side, size, limit).reduce_only(reduce_only),
            )
            .await
    }

    /// Reduce-only trigger order; the worst fill price is `slippage` beyond the trigger
    pub(crate) async fn protective_order(
        &self,
        metadata: &AssetMetadata,
        side: OrderSide,
        size: Decimal,
        kind: OrderKind,
        slippage: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        let trigger_price = kind.trigger_price().ok_or_else(|| {
            ExchangeError::InvalidParameters("Protective order requires a trigger price".into())
        })?;
        let limit = metadata.round_price(slipped_price(trigger_price, side, slippage));
        self.connector
            .place_order(OrderParameters::trigger(
                &metadata.instrument,
                side,
                size,
                kind,
                limit,
            ))
            .await
    }

    async fn market_request(&self, request: MarketOrderRequest) -> Result<OrderAck, ExchangeError> {
        require_positive("Size", request.size)?;
        let slippage = resolve_slippage(request.slippage)?;
        self.market_order(
            &request.instrument,
            request.side,
            request.size,
            slippage,
            request.reduce_only,
        )
        .await
    }

    async fn trigger_request(
        &self,
        request: TriggerOrderRequest,
        take_profit: bool,
    ) -> Result<OrderAck, ExchangeError> {
        require_positive("Size", request.size)?;
        require_positive("Trigger price", request.trigger_price)?;
        let slippage = resolve_slippage(request.slippage)?;
        let metadata = self.connector.get_asset_metadata(&request.instrument).await?;

        let trigger_price = metadata.round_price(request.trigger_price);
        let kind = if take_profit {
            OrderKind::TakeProfit { trigger_price }
        } else {
            OrderKind::StopLoss { trigger_price }
        };
        let size = metadata.round_size(request.size);
        self.protective_order(&metadata, request.side, size, kind, slippage)
            .await
    }

    async fn limit_request(&self, request: LimitOrderRequest) -> Result<OrderAck, ExchangeError> {
        require_positive("Size", request.size)?;
        require_positive("Price", request.price)?;
        let metadata = self.connector.get_asset_metadata(&request.instrument).await?;
        let order = OrderParameters::limit(
            &request.instrument,
            request.side,
            metadata.round_size(request.size),
            metadata.round_price(request.price),
            request.time_in_force.unwrap_or(TimeInForce::GTC),
        )
        .reduce_only(request.reduce_only);
        self.connector.place_order(order).await
    }

    async fn apply_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> Result<LeverageAck, ExchangeError> {
        validate_leverage(leverage)?;
        self.connector
            .set_leverage(instrument, leverage, cross_margin)
            .await?;
        Ok(LeverageAck {
            instrument: instrument.to_string(),
            leverage,
            cross_margin,
        })
    }
}

#[async_trait]
impl<C: ExchangeConnector> TradingOperations for Orchestrator<C> {
    #[instrument(skip(self, request), fields(instrument = %request.instrument, side = ?request.side))]
    async fn place_market_order(&self, request: MarketOrderRequest) -> ResultEnvelope<OrderAck> {
        self.market_request(request).await.into()
    }

    #[instrument(skip(self, request), fields(instrument = %request.instrument, side = ?request.side))]
    async fn place_limit_order(&self, request: LimitOrderRequest) -> ResultEnvelope<OrderAck> {
        self.limit_request(request).await.into()
    }

    #[instrument(skip(self, request), fields(instrument = %request.instrument))]
    async fn place_stop_loss(&self, request: TriggerOrderRequest) -> ResultEnvelope<OrderAck> {
        self.trigger_request(request, false).await.into()
    }

    #[instrument(skip(self, request), fields(instrument = %request.instrument))]
    async fn place_take_profit(&self, request: TriggerOrderRequest) -> ResultEnvelope<OrderAck> {
        self.trigger_request(request, true).await.into()
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, instrument: &str, order_id: &str) -> ResultEnvelope<CancelAck> {
        self.connector
            .cancel_order(instrument, order_id)
            .await
            .map(|()| CancelAck {
                instrument: instrument.to_string(),
                order_id: order_id.to_string(),
            })
            .into()
    }

    #[instrument(skip(self))]
    async fn cancel_all_orders(&self, instrument: Option<&str>) -> ResultEnvelope<CancelAllAck> {
        self.connector
            .cancel_all_orders(instrument)
            .await
            .map(|cancelled| CancelAllAck {
                instrument: instrument.map(str::to_string),
                cancelled,
            })
            .into()
    }

    #[instrument(skip(self))]
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> ResultEnvelope<LeverageAck> {
        self.apply_leverage(instrument, leverage, cross_margin)
            .await
            .into()
    }

    async fn quick_long(&self, request: QuickTradeRequest) -> ResultEnvelope<QuickTradeResult> {
        self.quick_trade(request, OrderSide::Buy).await.into()
    }

    async fn quick_short(&self, request: QuickTradeRequest) -> ResultEnvelope<QuickTradeResult> {
        self.quick_trade(request, OrderSide::Sell).await.into()
    }

    async fn close_position(&self, request: ClosePositionRequest) -> ResultEnvelope<OrderAck> {
        self.close(request).await.into()
    }

    async fn close_all_positions(
        &self,
        slippage: Option<Decimal>,
    ) -> ResultEnvelope<CloseAllResult> {
        self.close_all(slippage).await.into()
    }
}

/// Read-only balance and market surface; no side effects
pub struct ReadService<C> {
    connector: Arc<C>,
}

impl<C: ExchangeConnector> ReadService<C> {
    pub fn new(connector: Arc<C>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl<C: ExchangeConnector> BalanceOperations for ReadService<C> {
    async fn get_balances(&self) -> ResultEnvelope<Vec<Balance>> {
        self.connector.get_account_balance().await.into()
    }

    async fn get_positions(&self) -> ResultEnvelope<Vec<Position>> {
        self.connector.get_positions().await.into()
    }

    async fn get_position(&self, instrument: &str) -> ResultEnvelope<Position> {
        close::find_open_position(self.connector.as_ref(), instrument)
            .await
            .into()
    }

    async fn get_open_orders(&self, instrument: Option<&str>) -> ResultEnvelope<Vec<OpenOrder>> {
        self.connector.get_open_orders(instrument).await.into()
    }
}

#[async_trait]
impl<C: ExchangeConnector> MarketOperations for ReadService<C> {
    async fn get_current_price(&self, instrument: &str) -> ResultEnvelope<Decimal> {
        match self.connector.get_current_price(instrument).await {
            Ok(price) => ResultEnvelope::ok(price),
            Err(e) => ResultEnvelope::err(
                ExchangeError::price_unavailable(instrument, e.to_string()).to_string(),
            ),
        }
    }

    async fn get_asset_metadata(&self, instrument: &str) -> ResultEnvelope<AssetMetadata> {
        self.connector.get_asset_metadata(instrument).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_slippage_is_five_percent() {
        assert_eq!(DEFAULT_SLIPPAGE, dec!(0.05));
    }

    #[test]
    fn test_leverage_bounds() {
        assert!(validate_leverage(0).is_err());
        assert!(validate_leverage(1).is_ok());
        assert!(validate_leverage(50).is_ok());
        assert!(validate_leverage(51).is_err());
    }

    #[test]
    fn test_slippage_direction() {
        assert_eq!(slipped_price(dec!(100), OrderSide::Buy, dec!(0.05)), dec!(105));
        assert_eq!(slipped_price(dec!(100), OrderSide::Sell, dec!(0.05)), dec!(95));
    }

    #[test]
    fn test_slippage_validation() {
        assert_eq!(resolve_slippage(None).unwrap(), dec!(0.05));
        assert!(resolve_slippage(Some(dec!(-0.01))).is_err());
        assert!(resolve_slippage(Some(dec!(1))).is_err());
        assert_eq!(resolve_slippage(Some(dec!(0))).unwrap(), dec!(0));
    }
}
