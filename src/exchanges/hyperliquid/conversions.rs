use super::types::{
    AssetInfo, AssetPosition, ClearinghouseState, ExchangeResponse, ExchangeStatus,
    HyperliquidError, LimitWire, Meta, OpenOrder as HlOpenOrder, OrderTypeWire, OrderWire,
    TriggerWire,
};
use crate::core::errors::ExchangeError;
use crate::core::types::{
    AssetMetadata, Balance, OpenOrder, OrderAck, OrderKind, OrderParameters, OrderSide,
    OrderStatus, Position, TimeInForce,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Prices carry at most five significant figures
pub const PRICE_SIGNIFICANT_FIGURES: u32 = 5;
/// Perp prices carry at most `6 - szDecimals` decimals
pub const MAX_PRICE_DECIMALS: u32 = 6;
pub const COLLATERAL_ASSET: &str = "USDC";

pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ExchangeError> {
    Decimal::from_str(value).map_err(|e| {
        HyperliquidError::unexpected_response(format!("Invalid {} '{}': {}", field, value, e))
            .into()
    })
}

/// Look up a coin's asset index and catalog entry
pub fn find_asset<'a>(meta: &'a Meta, coin: &str) -> Result<(u32, &'a AssetInfo), ExchangeError> {
    meta.universe
        .iter()
        .enumerate()
        .find(|(_, asset)| asset.name == coin)
        .map(|(index, asset)| (index as u32, asset))
        .ok_or_else(|| HyperliquidError::asset_not_found(coin).into())
}

pub fn convert_asset_metadata(asset: &AssetInfo) -> AssetMetadata {
    AssetMetadata {
        instrument: asset.name.clone(),
        size_decimals: asset.sz_decimals,
        price_decimals: MAX_PRICE_DECIMALS.saturating_sub(asset.sz_decimals),
        price_significant_figures: Some(PRICE_SIGNIFICANT_FIGURES),
        max_leverage: asset.max_leverage,
        isolated_only: asset.only_isolated,
    }
}

pub const fn time_in_force_to_str(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GTC => "Gtc",
        TimeInForce::IOC => "Ioc",
        TimeInForce::ALO => "Alo",
    }
}

/// Render an order for the `order` action. Every order on this venue is a
/// limit order; market behaviour comes from IOC at the slippage price and
/// triggers fire as market orders capped at `limit_price`.
pub fn build_order_wire(
    order: &OrderParameters,
    asset: u32,
    metadata: &AssetMetadata,
) -> Result<OrderWire, ExchangeError> {
    let limit_price = order.limit_price.ok_or_else(|| {
        ExchangeError::InvalidParameters(format!(
            "Limit price is required for {}",
            order.instrument
        ))
    })?;

    let order_type = match order.kind {
        OrderKind::Market | OrderKind::Limit => OrderTypeWire::Limit(LimitWire {
            tif: time_in_force_to_str(order.time_in_force).to_string(),
        }),
        OrderKind::StopLoss { trigger_price } => OrderTypeWire::Trigger(TriggerWire {
            is_market: true,
            trigger_px: metadata.format_price(trigger_price),
            tpsl: "sl".to_string(),
        }),
        OrderKind::TakeProfit { trigger_price } => OrderTypeWire::Trigger(TriggerWire {
            is_market: true,
            trigger_px: metadata.format_price(trigger_price),
            tpsl: "tp".to_string(),
        }),
    };

    Ok(OrderWire {
        asset,
        is_buy: order.side.is_buy(),
        limit_px: metadata.format_price(limit_price),
        sz: metadata.format_size(order.size),
        reduce_only: order.reduce_only,
        order_type,
    })
}

/// Unwrap the envelope; a top-level `err` is a venue rejection
pub fn response_statuses(response: ExchangeResponse) -> Result<Vec<ExchangeStatus>, ExchangeError> {
    match response {
        ExchangeResponse::Ok(body) => Ok(body.data.map(|d| d.statuses).unwrap_or_default()),
        ExchangeResponse::Err(message) => Err(HyperliquidError::order_rejected(message).into()),
    }
}

/// Bare statuses the venue returns for accepted orders that have no oid yet
const PENDING_STATUSES: [&str; 2] = ["waitingForFill", "waitingForTrigger"];

pub fn convert_order_status(
    status: &ExchangeStatus,
    instrument: &str,
) -> Result<OrderAck, ExchangeError> {
    let (order_id, status) = match status {
        ExchangeStatus::Resting { resting } => (resting.oid, OrderStatus::Resting),
        ExchangeStatus::Filled { filled } => (
            filled.oid,
            OrderStatus::Filled {
                filled_size: parse_decimal("totalSz", &filled.total_sz)?,
                average_price: parse_decimal("avgPx", &filled.avg_px)?,
            },
        ),
        ExchangeStatus::Error { error } => {
            return Err(HyperliquidError::order_rejected(error.clone()).into())
        }
        ExchangeStatus::Message(message) if PENDING_STATUSES.contains(&message.as_str()) => {
            return Ok(OrderAck {
                order_id: String::new(),
                instrument: instrument.to_string(),
                status: OrderStatus::Pending,
            })
        }
        ExchangeStatus::Message(message) => {
            return Err(HyperliquidError::unexpected_response(format!(
                "Unexpected order status '{}'",
                message
            ))
            .into())
        }
    };

    Ok(OrderAck {
        order_id: order_id.to_string(),
        instrument: instrument.to_string(),
        status,
    })
}

pub fn convert_position(asset_position: &AssetPosition) -> Result<Position, ExchangeError> {
    let position = &asset_position.position;
    let optional = |field: &str, value: &Option<String>| {
        value
            .as_deref()
            .map(|v| parse_decimal(field, v))
            .transpose()
    };

    Ok(Position {
        instrument: position.coin.clone(),
        size: parse_decimal("szi", &position.szi)?,
        entry_price: optional("entryPx", &position.entry_px)?.unwrap_or_default(),
        unrealized_pnl: parse_decimal("unrealizedPnl", &position.unrealized_pnl)?,
        leverage: Some(Decimal::from(position.leverage.value)),
        liquidation_price: optional("liquidationPx", &position.liquidation_px)?,
    })
}

/// Perp margin is a single USDC balance
pub fn convert_balances(state: &ClearinghouseState) -> Result<Vec<Balance>, ExchangeError> {
    Ok(vec![Balance {
        asset: COLLATERAL_ASSET.to_string(),
        total: parse_decimal("accountValue", &state.margin_summary.account_value)?,
        available: parse_decimal("withdrawable", &state.withdrawable)?,
    }])
}

pub fn convert_open_order(order: &HlOpenOrder) -> Result<OpenOrder, ExchangeError> {
    let side = match order.side.as_str() {
        "B" => OrderSide::Buy,
        "A" => OrderSide::Sell,
        other => {
            return Err(HyperliquidError::unexpected_response(format!(
                "Unknown order side '{}'",
                other
            ))
            .into())
        }
    };

    Ok(OpenOrder {
        order_id: order.oid.to_string(),
        instrument: order.coin.clone(),
        side,
        size: parse_decimal("sz", &order.sz)?,
        price: parse_decimal("limitPx", &order.limit_px)?,
        trigger_price: order
            .trigger_px
            .as_deref()
            .map(|px| parse_decimal("triggerPx", px))
            .transpose()?
            .filter(|px| !px.is_zero()),
        reduce_only: order.reduce_only,
        timestamp: order.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::hyperliquid::types::{FilledOrder, RestingOrder};
    use rust_decimal_macros::dec;

    fn meta() -> Meta {
        serde_json::from_str(
            r#"{"universe":[
                {"name":"BTC","szDecimals":5,"maxLeverage":50},
                {"name":"ETH","szDecimals":4,"maxLeverage":50},
                {"name":"MEME","szDecimals":0,"maxLeverage":3,"onlyIsolated":true}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_asset_index_and_metadata() {
        let meta = meta();
        let (index, asset) = find_asset(&meta, "ETH").unwrap();
        assert_eq!(index, 1);
        let metadata = convert_asset_metadata(asset);
        assert_eq!(metadata.price_decimals, 2);
        assert_eq!(metadata.price_significant_figures, Some(5));

        let (_, meme) = find_asset(&meta, "MEME").unwrap();
        assert!(convert_asset_metadata(meme).isolated_only);
        assert!(matches!(
            find_asset(&meta, "DOGE"),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn test_market_order_wire() {
        let meta = meta();
        let metadata = convert_asset_metadata(&meta.universe[0]);
        let order = OrderParameters::market("BTC", OrderSide::Sell, dec!(0.012345), dec!(47500.04));
        let wire = build_order_wire(&order, 0, &metadata).unwrap();

        assert!(!wire.is_buy);
        assert_eq!(wire.sz, "0.01235");
        assert_eq!(wire.limit_px, "47500");
        assert_eq!(
            wire.order_type,
            OrderTypeWire::Limit(LimitWire {
                tif: "Ioc".to_string()
            })
        );
    }

    #[test]
    fn test_take_profit_wire_is_reduce_only_trigger() {
        let meta = meta();
        let metadata = convert_asset_metadata(&meta.universe[1]);
        let order = OrderParameters::trigger(
            "ETH",
            OrderSide::Sell,
            dec!(0.5),
            OrderKind::TakeProfit {
                trigger_price: dec!(3123.456),
            },
            dec!(2967.28),
        );
        let wire = build_order_wire(&order, 1, &metadata).unwrap();

        assert!(wire.reduce_only);
        assert_eq!(
            wire.order_type,
            OrderTypeWire::Trigger(TriggerWire {
                is_market: true,
                trigger_px: "3123.5".to_string(),
                tpsl: "tp".to_string(),
            })
        );
    }

    #[test]
    fn test_order_status_decoding() {
        let resting = ExchangeStatus::Resting {
            resting: RestingOrder { oid: 77 },
        };
        assert_eq!(
            convert_order_status(&resting, "BTC").unwrap().status,
            OrderStatus::Resting
        );

        let filled = ExchangeStatus::Filled {
            filled: FilledOrder {
                total_sz: "0.02".to_string(),
                avg_px: "50010.0".to_string(),
                oid: 78,
            },
        };
        let ack = convert_order_status(&filled, "BTC").unwrap();
        assert_eq!(ack.order_id, "78");
        assert_eq!(
            ack.status,
            OrderStatus::Filled {
                filled_size: dec!(0.02),
                average_price: dec!(50010.0)
            }
        );

        let rejected = ExchangeStatus::Error {
            error: "Insufficient margin to place order.".to_string(),
        };
        let err = convert_order_status(&rejected, "BTC").unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Insufficient margin to place order.");
    }

    #[test]
    fn test_waiting_statuses_are_accepted() {
        for waiting in ["waitingForFill", "waitingForTrigger"] {
            let status: ExchangeStatus =
                serde_json::from_str(&format!("\"{}\"", waiting)).unwrap();
            let ack = convert_order_status(&status, "ETH").unwrap();
            assert_eq!(ack.status, OrderStatus::Pending);
            assert_eq!(ack.instrument, "ETH");
            assert!(ack.order_id.is_empty());
        }

        let unknown = ExchangeStatus::Message("success".to_string());
        assert!(!convert_order_status(&unknown, "ETH").unwrap_err().is_rejection());
    }

    #[test]
    fn test_top_level_error_is_rejection() {
        let response: ExchangeResponse =
            serde_json::from_str(r#"{"status":"err","response":"User or API Wallet does not exist."}"#)
                .unwrap();
        assert!(response_statuses(response).unwrap_err().is_rejection());

        let response: ExchangeResponse =
            serde_json::from_str(r#"{"status":"ok","response":{"type":"default"}}"#).unwrap();
        assert!(response_statuses(response).unwrap().is_empty());
    }

    #[test]
    fn test_position_and_balance_conversion() {
        let state: ClearinghouseState = serde_json::from_value(serde_json::json!({
            "assetPositions": [{
                "type": "oneWay",
                "position": {
                    "coin": "ETH",
                    "szi": "-1.5",
                    "entryPx": "3000.5",
                    "leverage": {"type": "cross", "value": 10},
                    "liquidationPx": null,
                    "unrealizedPnl": "12.3",
                    "marginUsed": "450.0"
                }
            }],
            "marginSummary": {"accountValue": "10500.25", "totalMarginUsed": "450.0", "totalNtlPos": "4500.0"},
            "withdrawable": "9800.0"
        }))
        .unwrap();

        let position = convert_position(&state.asset_positions[0]).unwrap();
        assert_eq!(position.size, dec!(-1.5));
        assert_eq!(position.side(), OrderSide::Sell);
        assert_eq!(position.leverage, Some(dec!(10)));
        assert_eq!(position.liquidation_price, None);

        let balances = convert_balances(&state).unwrap();
        assert_eq!(balances[0].asset, "USDC");
        assert_eq!(balances[0].available, dec!(9800.0));
    }
}
