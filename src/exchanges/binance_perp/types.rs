use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinancePerpError {
    #[error("Order rejected: status={status}, symbol={symbol}")]
    OrderRejected { status: String, symbol: String },

    #[error("Symbol not listed: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("JSON parsing failed: {message}, context={context:?}")]
    ParseError {
        message: String,
        context: Option<String>,
    },

    #[error("Invalid parameters: {message}, symbol={symbol:?}")]
    ValidationError {
        message: String,
        symbol: Option<String>,
    },
}

impl BinancePerpError {
    #[cold]
    #[inline(never)]
    pub fn order_rejected(status: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::OrderRejected {
            status: status.into(),
            symbol: symbol.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn parse_error(message: impl Into<String>, context: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            context,
        }
    }

    #[cold]
    #[inline(never)]
    pub fn validation_error(message: impl Into<String>, symbol: Option<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            symbol,
        }
    }
}

impl From<BinancePerpError> for crate::core::errors::ExchangeError {
    fn from(err: BinancePerpError) -> Self {
        match err {
            BinancePerpError::OrderRejected { .. } => Self::rejected(err.to_string()),
            BinancePerpError::UnknownSymbol { symbol } => {
                Self::NotFound(format!("Unknown symbol: {}", symbol))
            }
            BinancePerpError::ParseError { message, context } => Self::DeserializationError(
                context.map_or_else(|| message.clone(), |c| format!("{} ({})", message, c)),
            ),
            BinancePerpError::ValidationError { message, .. } => Self::InvalidParameters(message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpMarket {
    pub symbol: String,
    pub status: String,
    pub price_precision: u32,
    pub quantity_precision: u32,
    #[serde(default)]
    pub filters: Vec<BinancePerpFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpFilter {
    pub filter_type: String,
    pub tick_size: Option<String>,
    pub step_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BinancePerpExchangeInfo {
    pub symbols: Vec<BinancePerpMarket>,
}

#[derive(Debug, Deserialize)]
pub struct BinancePerpTickerPrice {
    pub symbol: String,
    pub price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpBracket {
    pub bracket: u32,
    pub initial_leverage: u32,
}

#[derive(Debug, Deserialize)]
pub struct BinancePerpLeverageBracket {
    pub symbol: String,
    pub brackets: Vec<BinancePerpBracket>,
}

/// `leverageBracket` answers with an object or a one-element list depending on venue version
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BinancePerpLeverageBracketResponse {
    Many(Vec<BinancePerpLeverageBracket>),
    One(BinancePerpLeverageBracket),
}

impl BinancePerpLeverageBracketResponse {
    pub fn into_vec(self) -> Vec<BinancePerpLeverageBracket> {
        match self {
            Self::Many(brackets) => brackets,
            Self::One(bracket) => vec![bracket],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinancePerpOrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    ExpiredInMatch,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpOrderResponse {
    pub order_id: u64,
    pub symbol: String,
    pub status: BinancePerpOrderStatus,
    #[serde(default)]
    pub executed_qty: String,
    #[serde(default)]
    pub avg_price: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpOpenOrder {
    pub order_id: u64,
    pub symbol: String,
    pub side: String,
    pub orig_qty: String,
    pub price: String,
    #[serde(default)]
    pub stop_price: String,
    #[serde(default)]
    pub reduce_only: bool,
    pub time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePerpBalance {
    pub asset: String,
    pub balance: String,
    pub available_balance: String,
}

#[derive(Debug, Deserialize)]
pub struct BinancePerpPosition {
    pub symbol: String,
    #[serde(rename = "positionAmt")]
    pub position_amt: String,
    #[serde(rename = "entryPrice")]
    pub entry_price: String,
    #[serde(rename = "unRealizedProfit")]
    pub unrealized_profit: String,
    #[serde(rename = "liquidationPrice")]
    pub liquidation_price: String,
    #[serde(default)]
    pub leverage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BinancePerpLeverageResponse {
    pub leverage: u32,
    pub symbol: String,
}

/// Generic `{code, msg}` acknowledgement
#[derive(Debug, Deserialize, Serialize)]
pub struct BinancePerpCodeResponse {
    pub code: i64,
    pub msg: String,
}
