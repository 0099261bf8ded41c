use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::OrderPlacer;
use crate::core::types::{OrderAck, OrderParameters};
use crate::exchanges::hyperliquid::conversions::{
    build_order_wire, convert_asset_metadata, convert_order_status, find_asset,
    response_statuses,
};
use crate::exchanges::hyperliquid::rest::HyperliquidRest;
use crate::exchanges::hyperliquid::types::{CancelWire, ExchangeStatus, HyperliquidError};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

/// Trading implementation for Hyperliquid
pub struct Trading<R: RestClient> {
    rest: HyperliquidRest<R>,
}

impl<R: RestClient> Trading<R> {
    pub fn new(rest: HyperliquidRest<R>) -> Self {
        Self { rest }
    }
}

fn parse_oid(order_id: &str) -> Result<u64, ExchangeError> {
    order_id.parse::<u64>().map_err(|e| {
        ExchangeError::InvalidParameters(format!("Invalid order ID format: {}", e))
    })
}

/// Split cancel statuses into a success count and the venue's error messages
fn tally_cancels(statuses: &[ExchangeStatus]) -> (usize, Vec<String>) {
    let mut cancelled = 0;
    let mut errors = Vec::new();
    for status in statuses {
        match status {
            ExchangeStatus::Error { error } => errors.push(error.clone()),
            _ => cancelled += 1,
        }
    }
    (cancelled, errors)
}

#[async_trait]
impl<R: RestClient + Clone> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = "hyperliquid", coin = %order.instrument, kind = ?order.kind))]
    async fn place_order(&self, order: OrderParameters) -> Result<OrderAck, ExchangeError> {
        let meta = self.rest.get_meta().await?;
        let (asset, info) = find_asset(&meta, &order.instrument)?;
        let metadata = convert_asset_metadata(info);

        let wire = build_order_wire(&order, asset, &metadata)?;
        let statuses = response_statuses(self.rest.place_orders(vec![wire]).await?)?;
        let status = statuses.first().ok_or_else(|| {
            HyperliquidError::unexpected_response("Order response carried no status")
        })?;
        convert_order_status(status, &order.instrument)
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn cancel_order(&self, instrument: &str, order_id: &str) -> Result<(), ExchangeError> {
        let oid = parse_oid(order_id)?;
        let meta = self.rest.get_meta().await?;
        let (asset, _) = find_asset(&meta, instrument)?;

        let statuses =
            response_statuses(self.rest.cancel_orders(vec![CancelWire { asset, oid }]).await?)?;
        match tally_cancels(&statuses).1.into_iter().next() {
            Some(error) => Err(HyperliquidError::order_rejected(error).into()),
            None => Ok(()),
        }
    }

    /// One bulk cancel for every open order (optionally of one coin)
    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn cancel_all_orders(&self, instrument: Option<&str>) -> Result<usize, ExchangeError> {
        let open = self.rest.get_open_orders().await?;
        let open: Vec<_> = open
            .into_iter()
            .filter(|order| instrument.map_or(true, |coin| order.coin == coin))
            .collect();
        if open.is_empty() {
            return Ok(0);
        }

        let meta = self.rest.get_meta().await?;
        let cancels = open
            .iter()
            .map(|order| {
                find_asset(&meta, &order.coin).map(|(asset, _)| CancelWire {
                    asset,
                    oid: order.oid,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let statuses = response_statuses(self.rest.cancel_orders(cancels).await?)?;
        let (cancelled, errors) = tally_cancels(&statuses);
        if !errors.is_empty() {
            warn!(failed = errors.len(), first = %errors[0], "Some cancels were rejected");
            if cancelled == 0 {
                return Err(HyperliquidError::order_rejected(errors[0].clone()).into());
            }
        }
        info!(cancelled, "Cancelled open orders");
        Ok(cancelled)
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> Result<(), ExchangeError> {
        let meta = self.rest.get_meta().await?;
        let (asset, _) = find_asset(&meta, instrument)?;
        response_statuses(
            self.rest
                .update_leverage(asset, cross_margin, leverage)
                .await?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::hyperliquid::types::RestingOrder;

    #[test]
    fn test_tally_cancels() {
        let statuses = vec![
            ExchangeStatus::Message("success".to_string()),
            ExchangeStatus::Error {
                error: "Order was never placed, already canceled, or filled.".to_string(),
            },
            ExchangeStatus::Resting {
                resting: RestingOrder { oid: 1 },
            },
        ];
        let (cancelled, errors) = tally_cancels(&statuses);
        assert_eq!(cancelled, 2);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_order_id_must_be_numeric() {
        assert!(parse_oid("abc").is_err());
        assert_eq!(parse_oid("77738308").unwrap(), 77_738_308);
    }
}
