use crate::core::errors::ExchangeError;
use crate::core::format;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Venues the gateway can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Aster,
    Hyperliquid,
}

impl ExchangeId {
    pub const ALL: [Self; 3] = [Self::Binance, Self::Aster, Self::Hyperliquid];

    /// Prefix used for `{PREFIX}_API_KEY` style environment variables
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::Binance => "BINANCE",
            Self::Aster => "ASTER",
            Self::Hyperliquid => "HYPERLIQUID",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "binance"),
            Self::Aster => write!(f, "aster"),
            Self::Hyperliquid => write!(f, "hyperliquid"),
        }
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "aster" => Ok(Self::Aster),
            "hyperliquid" => Ok(Self::Hyperliquid),
            other => Err(ExchangeError::NotFound(format!("Unknown exchange: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingType {
    Perpetual,
    Spot,
}

impl fmt::Display for TradingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perpetual => write!(f, "perpetual"),
            Self::Spot => write!(f, "spot"),
        }
    }
}

impl FromStr for TradingType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "perpetual" | "perp" | "futures" => Ok(Self::Perpetual),
            "spot" => Ok(Self::Spot),
            other => Err(ExchangeError::NotFound(format!(
                "Unknown trading type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy)
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    GTC, // Good Till Canceled
    IOC, // Immediate or Cancel
    ALO, // Add Liquidity Only (post-only)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderKind {
    /// Marketable IOC limit; `limit_price` is the slippage-capped worst price.
    Market,
    Limit,
    StopLoss { trigger_price: Decimal },
    TakeProfit { trigger_price: Decimal },
}

impl OrderKind {
    pub const fn trigger_price(&self) -> Option<Decimal> {
        match self {
            Self::StopLoss { trigger_price } | Self::TakeProfit { trigger_price } => {
                Some(*trigger_price)
            }
            Self::Market | Self::Limit => None,
        }
    }
}

/// A fully resolved order, in exact decimals. Adapters render size and prices
/// with the formatter at the instrument's precision right before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParameters {
    pub instrument: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub limit_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub kind: OrderKind,
}

impl OrderParameters {
    /// Immediate-or-cancel order capped at `worst_price`
    pub fn market(instrument: &str, side: OrderSide, size: Decimal, worst_price: Decimal) -> Self {
        Self {
            instrument: instrument.to_string(),
            side,
            size,
            limit_price: Some(worst_price),
            time_in_force: TimeInForce::IOC,
            reduce_only: false,
            kind: OrderKind::Market,
        }
    }

    pub fn limit(
        instrument: &str,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            instrument: instrument.to_string(),
            side,
            size,
            limit_price: Some(price),
            time_in_force,
            reduce_only: false,
            kind: OrderKind::Limit,
        }
    }

    /// Market-on-trigger order. `limit_price` is the worst fill price once triggered.
    pub fn trigger(
        instrument: &str,
        side: OrderSide,
        size: Decimal,
        kind: OrderKind,
        limit_price: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.to_string(),
            side,
            size,
            limit_price: Some(limit_price),
            time_in_force: TimeInForce::GTC,
            reduce_only: true,
            kind,
        }
    }

    #[must_use]
    pub const fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }
}

/// Per-instrument trading constraints from the venue catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub instrument: String,
    pub size_decimals: u32,
    pub price_decimals: u32,
    /// Venue cap on significant figures for prices, if any
    pub price_significant_figures: Option<u32>,
    pub max_leverage: u32,
    pub isolated_only: bool,
}

impl AssetMetadata {
    pub fn round_size(&self, size: Decimal) -> Decimal {
        format::round_decimal(size, self.size_decimals)
    }

    /// Integer prices are always accepted; otherwise significant figures and
    /// decimal places are both capped.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        if price == price.trunc() {
            return price;
        }
        let price = match self.price_significant_figures {
            Some(figures) => format::round_significant(price, figures),
            None => price,
        };
        format::round_decimal(price, self.price_decimals)
    }

    pub fn format_size(&self, size: Decimal) -> String {
        format::format_decimal(size, self.size_decimals)
    }

    pub fn format_price(&self, price: Decimal) -> String {
        format::format_decimal(self.round_price(price), self.price_decimals)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum OrderStatus {
    Resting,
    /// Accepted but parked until a fill or trigger; the venue assigns no id yet
    Pending,
    #[serde(rename_all = "camelCase")]
    Filled {
        filled_size: Decimal,
        average_price: Decimal,
    },
}

/// Accepted order. Venue rejections never become an `OrderAck`.
/// `order_id` is empty while the status is `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    pub instrument: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub instrument: String,
    /// Positive = long, negative = short
    pub size: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        !self.size.is_zero()
    }

    pub fn side(&self) -> OrderSide {
        if self.size.is_sign_negative() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: String,
    pub instrument: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
    pub trigger_price: Option<Decimal>,
    pub reduce_only: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub asset: String,
    pub total: Decimal,
    pub available: Decimal,
}

/// Uniform return shape of every gateway operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

impl<T> ResultEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

impl<T> From<Result<T, ExchangeError>> for ResultEnvelope<T> {
    fn from(result: Result<T, ExchangeError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// Orchestrator requests

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickTradeRequest {
    pub instrument: String,
    /// Margin to commit, in quote currency
    pub usd_value: Decimal,
    pub leverage: u32,
    /// Percent of equity at risk; divided by leverage to get the price offset
    pub stop_loss_percent: Option<Decimal>,
    pub take_profit_percent: Option<Decimal>,
    #[serde(default = "default_cross_margin")]
    pub cross_margin: bool,
    pub slippage: Option<Decimal>,
}

const fn default_cross_margin() -> bool {
    true
}

impl QuickTradeRequest {
    pub fn new(instrument: &str, usd_value: Decimal, leverage: u32) -> Self {
        Self {
            instrument: instrument.to_string(),
            usd_value,
            leverage,
            stop_loss_percent: None,
            take_profit_percent: None,
            cross_margin: true,
            slippage: None,
        }
    }

    #[must_use]
    pub const fn with_stop_loss(mut self, percent: Decimal) -> Self {
        self.stop_loss_percent = Some(percent);
        self
    }

    #[must_use]
    pub const fn with_take_profit(mut self, percent: Decimal) -> Self {
        self.take_profit_percent = Some(percent);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionRequest {
    pub instrument: String,
    /// Partial close size; `None` closes the whole position
    pub size: Option<Decimal>,
    pub slippage: Option<Decimal>,
}

impl ClosePositionRequest {
    pub fn full(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            size: None,
            slippage: None,
        }
    }

    pub fn partial(instrument: &str, size: Decimal) -> Self {
        Self {
            instrument: instrument.to_string(),
            size: Some(size),
            slippage: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrderRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub slippage: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub reduce_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOrderRequest {
    pub instrument: String,
    /// Side of the protective order itself (opposite of the position)
    pub side: OrderSide,
    pub size: Decimal,
    pub trigger_price: Decimal,
    pub slippage: Option<Decimal>,
}

// Orchestrator results

/// Outcome of a protective order. `Failed` is a partial protection failure:
/// the entry stands and the caller must inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProtectionOutcome {
    Placed { order: OrderAck },
    Failed { error: String },
    Skipped,
}

impl ProtectionOutcome {
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<Result<OrderAck, ExchangeError>> for ProtectionOutcome {
    fn from(result: Result<OrderAck, ExchangeError>) -> Self {
        match result {
            Ok(order) => Self::Placed { order },
            Err(e) => Self::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickTradeResult {
    pub side: OrderSide,
    pub entry: OrderAck,
    pub stop_loss: ProtectionOutcome,
    pub take_profit: ProtectionOutcome,
    /// Reference price read before sizing
    pub computed_entry_price: Decimal,
    /// Slippage-capped price the IOC entry was sent with
    pub entry_limit_price: Decimal,
    pub computed_size: Decimal,
    pub computed_stop_loss_price: Option<Decimal>,
    pub computed_take_profit_price: Option<Decimal>,
    pub leverage_warning: Option<String>,
}

impl QuickTradeResult {
    pub const fn has_degraded_protection(&self) -> bool {
        self.stop_loss.is_failed() || self.take_profit.is_failed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub instrument: String,
    pub result: ResultEnvelope<OrderAck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseAllResult {
    pub results: Vec<CloseOutcome>,
    pub closed: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageAck {
    pub instrument: String,
    pub leverage: u32,
    pub cross_margin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAck {
    pub instrument: String,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllAck {
    pub instrument: Option<String>,
    pub cancelled: usize,
}
