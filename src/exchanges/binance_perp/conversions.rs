use crate::core::errors::ExchangeError;
use crate::core::format::decimals_of;
use crate::core::kernel::{param, Params};
use crate::core::types::{
    AssetMetadata, Balance, OpenOrder, OrderAck, OrderKind, OrderParameters, OrderSide,
    OrderStatus, Position, TimeInForce,
};
use crate::exchanges::binance_perp::types::{
    BinancePerpBalance, BinancePerpError, BinancePerpLeverageBracket, BinancePerpMarket,
    BinancePerpOpenOrder, BinancePerpOrderResponse, BinancePerpOrderStatus, BinancePerpPosition,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

/// Leverage ceiling assumed when the bracket endpoint is unavailable
pub const DEFAULT_MAX_LEVERAGE: u32 = 50;

pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ExchangeError> {
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(value).map_err(|e| {
        BinancePerpError::parse_error(
            format!("Invalid decimal '{}': {}", value, e),
            Some(field.to_string()),
        )
        .into()
    })
}

pub fn order_side_to_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

pub fn str_to_order_side(side: &str) -> Result<OrderSide, ExchangeError> {
    match side {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        other => Err(BinancePerpError::parse_error(
            format!("Unknown order side: {}", other),
            Some("side".to_string()),
        )
        .into()),
    }
}

/// Post-only is `GTX` on USDⓈ-M futures
pub fn time_in_force_to_str(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GTC => "GTC",
        TimeInForce::IOC => "IOC",
        TimeInForce::ALO => "GTX",
    }
}

fn filter_decimals(market: &BinancePerpMarket, filter_type: &str) -> Option<u32> {
    let filter = market.filters.iter().find(|f| f.filter_type == filter_type)?;
    let step = filter.step_size.as_deref().or(filter.tick_size.as_deref())?;
    Decimal::from_str(step).ok().map(decimals_of)
}

/// Catalog entry → metadata. Step sizes win over the advertised precision.
pub fn convert_market_metadata(market: &BinancePerpMarket, max_leverage: u32) -> AssetMetadata {
    AssetMetadata {
        instrument: market.symbol.clone(),
        size_decimals: filter_decimals(market, "LOT_SIZE")
            .unwrap_or(market.quantity_precision),
        price_decimals: filter_decimals(market, "PRICE_FILTER")
            .unwrap_or(market.price_precision),
        price_significant_figures: None,
        max_leverage,
        isolated_only: false,
    }
}

/// Highest initial leverage across the symbol's brackets
pub fn max_leverage_from_brackets(
    symbol: &str,
    brackets: &[BinancePerpLeverageBracket],
) -> Option<u32> {
    brackets
        .iter()
        .find(|b| b.symbol == symbol)
        .and_then(|b| b.brackets.iter().map(|br| br.initial_leverage).max())
}

/// Render an order as ordered wire parameters.
///
/// Market orders are sent as IOC limits at the slippage-capped price so the
/// worst fill is bounded. Stop-loss/take-profit become `STOP_MARKET` /
/// `TAKE_PROFIT_MARKET` triggers on the mark price.
pub fn build_order_params(
    order: &OrderParameters,
    metadata: &AssetMetadata,
) -> Result<Params, ExchangeError> {
    let mut params = vec![
        param("symbol", &order.instrument),
        param("side", order_side_to_str(order.side)),
    ];

    match order.kind {
        OrderKind::Market | OrderKind::Limit => {
            let price = order.limit_price.ok_or_else(|| {
                BinancePerpError::validation_error(
                    "Limit price is required",
                    Some(order.instrument.clone()),
                )
            })?;
            params.push(param("type", "LIMIT"));
            params.push(param(
                "timeInForce",
                time_in_force_to_str(order.time_in_force),
            ));
            params.push(param("quantity", metadata.format_size(order.size)));
            params.push(param("price", metadata.format_price(price)));
        }
        OrderKind::StopLoss { trigger_price } | OrderKind::TakeProfit { trigger_price } => {
            let order_type = if matches!(order.kind, OrderKind::StopLoss { .. }) {
                "STOP_MARKET"
            } else {
                "TAKE_PROFIT_MARKET"
            };
            params.push(param("type", order_type));
            params.push(param("quantity", metadata.format_size(order.size)));
            params.push(param("stopPrice", metadata.format_price(trigger_price)));
            params.push(param("workingType", "MARK_PRICE"));
        }
    }

    if order.reduce_only {
        params.push(param("reduceOnly", "true"));
    }
    params.push(param("newOrderRespType", "RESULT"));
    Ok(params)
}

/// Decode the order response into an acknowledgement; terminal states without
/// any fill are rejections.
pub fn convert_order_response(response: &BinancePerpOrderResponse) -> Result<OrderAck, ExchangeError> {
    let filled_size = parse_decimal("executedQty", &response.executed_qty)?;
    let status = match response.status {
        BinancePerpOrderStatus::New => OrderStatus::Resting,
        BinancePerpOrderStatus::PartiallyFilled | BinancePerpOrderStatus::Filled => {
            OrderStatus::Filled {
                filled_size,
                average_price: parse_decimal("avgPrice", &response.avg_price)?,
            }
        }
        BinancePerpOrderStatus::Expired | BinancePerpOrderStatus::ExpiredInMatch
            if filled_size > Decimal::ZERO =>
        {
            OrderStatus::Filled {
                filled_size,
                average_price: parse_decimal("avgPrice", &response.avg_price)?,
            }
        }
        status => {
            return Err(BinancePerpError::order_rejected(
                format!("{:?}", status),
                &response.symbol,
            )
            .into())
        }
    };

    Ok(OrderAck {
        order_id: response.order_id.to_string(),
        instrument: response.symbol.clone(),
        status,
    })
}

pub fn convert_position(position: &BinancePerpPosition) -> Result<Position, ExchangeError> {
    let liquidation_price = parse_decimal("liquidationPrice", &position.liquidation_price)?;
    Ok(Position {
        instrument: position.symbol.clone(),
        size: parse_decimal("positionAmt", &position.position_amt)?,
        entry_price: parse_decimal("entryPrice", &position.entry_price)?,
        unrealized_pnl: parse_decimal("unRealizedProfit", &position.unrealized_profit)?,
        leverage: position
            .leverage
            .as_deref()
            .map(|l| parse_decimal("leverage", l))
            .transpose()?,
        liquidation_price: (!liquidation_price.is_zero()).then_some(liquidation_price),
    })
}

pub fn convert_balance(balance: &BinancePerpBalance) -> Result<Balance, ExchangeError> {
    Ok(Balance {
        asset: balance.asset.clone(),
        total: parse_decimal("balance", &balance.balance)?,
        available: parse_decimal("availableBalance", &balance.available_balance)?,
    })
}

pub fn convert_open_order(order: &BinancePerpOpenOrder) -> Result<OpenOrder, ExchangeError> {
    let trigger_price = parse_decimal("stopPrice", &order.stop_price)?;
    Ok(OpenOrder {
        order_id: order.order_id.to_string(),
        instrument: order.symbol.clone(),
        side: str_to_order_side(&order.side).unwrap_or_else(|e| {
            warn!("{}, defaulting to Buy", e);
            OrderSide::Buy
        }),
        size: parse_decimal("origQty", &order.orig_qty)?,
        price: parse_decimal("price", &order.price)?,
        trigger_price: (!trigger_price.is_zero()).then_some(trigger_price),
        reduce_only: order.reduce_only,
        timestamp: order.time,
    })
}
