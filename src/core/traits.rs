use crate::core::{
    errors::ExchangeError,
    types::{
        AssetMetadata, Balance, CancelAck, CancelAllAck, ClosePositionRequest, CloseAllResult,
        LeverageAck, LimitOrderRequest, MarketOrderRequest, OpenOrder, OrderAck, OrderParameters,
        Position, QuickTradeRequest, QuickTradeResult, ResultEnvelope, TriggerOrderRequest,
    },
};
use async_trait::async_trait;
use rust_decimal::Decimal;

// Connector level: typed results, errors as `ExchangeError`.

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Current mid/last price for an instrument
    async fn get_current_price(&self, instrument: &str) -> Result<Decimal, ExchangeError>;

    /// Precision and leverage constraints for an instrument
    async fn get_asset_metadata(&self, instrument: &str) -> Result<AssetMetadata, ExchangeError>;
}

#[async_trait]
pub trait OrderPlacer: Send + Sync {
    /// Place a new order. Venue rejections come back as `ExchangeRejected`.
    async fn place_order(&self, order: OrderParameters) -> Result<OrderAck, ExchangeError>;

    async fn cancel_order(&self, instrument: &str, order_id: &str) -> Result<(), ExchangeError>;

    /// Cancel every open order, optionally for one instrument. Returns how many were cancelled.
    async fn cancel_all_orders(&self, instrument: Option<&str>) -> Result<usize, ExchangeError>;

    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> Result<(), ExchangeError>;
}

#[async_trait]
pub trait AccountInfo: Send + Sync {
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError>;

    /// Open (non-zero) positions
    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError>;

    async fn get_open_orders(&self, instrument: Option<&str>)
        -> Result<Vec<OpenOrder>, ExchangeError>;
}

/// Everything an orchestrator needs from one venue
pub trait ExchangeConnector: MarketDataSource + OrderPlacer + AccountInfo {}

impl<T: MarketDataSource + OrderPlacer + AccountInfo> ExchangeConnector for T {}

// Surface level: every call returns a `ResultEnvelope` and never an error.

#[async_trait]
pub trait TradingOperations: Send + Sync {
    async fn place_market_order(&self, request: MarketOrderRequest) -> ResultEnvelope<OrderAck>;
    async fn place_limit_order(&self, request: LimitOrderRequest) -> ResultEnvelope<OrderAck>;
    async fn place_stop_loss(&self, request: TriggerOrderRequest) -> ResultEnvelope<OrderAck>;
    async fn place_take_profit(&self, request: TriggerOrderRequest) -> ResultEnvelope<OrderAck>;
    async fn cancel_order(&self, instrument: &str, order_id: &str) -> ResultEnvelope<CancelAck>;
    async fn cancel_all_orders(&self, instrument: Option<&str>) -> ResultEnvelope<CancelAllAck>;
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> ResultEnvelope<LeverageAck>;
    async fn quick_long(&self, request: QuickTradeRequest) -> ResultEnvelope<QuickTradeResult>;
    async fn quick_short(&self, request: QuickTradeRequest) -> ResultEnvelope<QuickTradeResult>;
    async fn close_position(&self, request: ClosePositionRequest) -> ResultEnvelope<OrderAck>;
    async fn close_all_positions(&self, slippage: Option<Decimal>)
        -> ResultEnvelope<CloseAllResult>;
}

#[async_trait]
pub trait BalanceOperations: Send + Sync {
    async fn get_balances(&self) -> ResultEnvelope<Vec<Balance>>;
    async fn get_positions(&self) -> ResultEnvelope<Vec<Position>>;
    /// Fails with "No position found" when the instrument is flat
    async fn get_position(&self, instrument: &str) -> ResultEnvelope<Position>;
    async fn get_open_orders(&self, instrument: Option<&str>) -> ResultEnvelope<Vec<OpenOrder>>;
}

#[async_trait]
pub trait MarketOperations: Send + Sync {
    async fn get_current_price(&self, instrument: &str) -> ResultEnvelope<Decimal>;
    async fn get_asset_metadata(&self, instrument: &str) -> ResultEnvelope<AssetMetadata>;
}
