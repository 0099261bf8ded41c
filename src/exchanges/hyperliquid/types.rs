use crate::core::errors::ExchangeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HyperliquidError {
    #[error("Asset not found: {coin}")]
    AssetNotFound { coin: String },

    #[error("{message}")]
    OrderRejected { message: String },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Signing key is required for {operation}")]
    SignerRequired { operation: String },
}

impl HyperliquidError {
    #[cold]
    #[inline(never)]
    pub fn asset_not_found(coin: &str) -> Self {
        Self::AssetNotFound {
            coin: coin.to_string(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn order_rejected(message: impl Into<String>) -> Self {
        Self::OrderRejected {
            message: message.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn signer_required(operation: &str) -> Self {
        Self::SignerRequired {
            operation: operation.to_string(),
        }
    }
}

impl From<HyperliquidError> for ExchangeError {
    fn from(err: HyperliquidError) -> Self {
        match err {
            HyperliquidError::AssetNotFound { coin } => {
                Self::NotFound(format!("Asset not found: {}", coin))
            }
            HyperliquidError::OrderRejected { message } => Self::rejected(message),
            HyperliquidError::UnexpectedResponse { message } => Self::DeserializationError(message),
            err @ HyperliquidError::SignerRequired { .. } => Self::credential(err.to_string()),
        }
    }
}

// Info endpoint

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    Meta,
    AllMids,
    ClearinghouseState { user: String },
    OpenOrders { user: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub name: String,
    pub sz_decimals: u32,
    pub max_leverage: u32,
    #[serde(default)]
    pub only_isolated: bool,
    #[serde(default)]
    pub is_delisted: bool,
}

/// Perpetuals universe; an asset's index is its position in this list
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub universe: Vec<AssetInfo>,
}

pub type AllMids = HashMap<String, String>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    pub asset_positions: Vec<AssetPosition>,
    pub margin_summary: MarginSummary,
    pub withdrawable: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: PositionData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub coin: String,
    /// Signed size
    pub szi: String,
    pub entry_px: Option<String>,
    pub leverage: Leverage,
    pub liquidation_px: Option<String>,
    pub unrealized_pnl: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leverage {
    #[serde(rename = "type")]
    pub leverage_type: String,
    pub value: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: String,
    pub total_margin_used: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub coin: String,
    /// `B` for bids, `A` for asks
    pub side: String,
    pub limit_px: String,
    pub sz: String,
    pub oid: u64,
    pub timestamp: i64,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default)]
    pub trigger_px: Option<String>,
}

// Exchange endpoint. Field order is part of the signed msgpack encoding.

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order(BulkOrder),
    Cancel(BulkCancel),
    UpdateLeverage(UpdateLeverage),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkOrder {
    pub orders: Vec<OrderWire>,
    pub grouping: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "b")]
    pub is_buy: bool,
    #[serde(rename = "p")]
    pub limit_px: String,
    #[serde(rename = "s")]
    pub sz: String,
    #[serde(rename = "r")]
    pub reduce_only: bool,
    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderTypeWire {
    Limit(LimitWire),
    Trigger(TriggerWire),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LimitWire {
    /// `Gtc`, `Ioc` or `Alo`
    pub tif: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWire {
    pub is_market: bool,
    pub trigger_px: String,
    /// `sl` or `tp`
    pub tpsl: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkCancel {
    pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeverage {
    pub asset: u32,
    pub is_cross: bool,
    pub leverage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    pub action: Action,
    pub nonce: u64,
    pub signature: ActionSignature,
    pub vault_address: Option<String>,
}

/// `{"status":"ok","response":{...}}` or `{"status":"err","response":"message"}`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", content = "response", rename_all = "camelCase")]
pub enum ExchangeResponse {
    Ok(ExchangeResponseBody),
    Err(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponseBody {
    #[serde(rename = "type")]
    pub response_type: String,
    pub data: Option<StatusData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub statuses: Vec<ExchangeStatus>,
}

/// One entry per order or cancel in the action, in request order
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExchangeStatus {
    Resting { resting: RestingOrder },
    Filled { filled: FilledOrder },
    Error { error: String },
    /// Bare string such as `"success"` for cancels
    Message(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RestingOrder {
    pub oid: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilledOrder {
    pub total_sz: String,
    pub avg_px: String,
    pub oid: u64,
}
