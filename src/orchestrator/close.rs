use super::{resolve_slippage, Orchestrator};
use crate::core::errors::ExchangeError;
use crate::core::traits::{AccountInfo, ExchangeConnector};
use crate::core::types::{
    CloseAllResult, CloseOutcome, ClosePositionRequest, OrderAck, Position, ResultEnvelope,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// Read positions and return the open one for `instrument`, if any
pub(crate) async fn find_open_position<A: AccountInfo + ?Sized>(
    account: &A,
    instrument: &str,
) -> Result<Position, ExchangeError> {
    account
        .get_positions()
        .await?
        .into_iter()
        .find(|p| p.instrument == instrument && p.is_open())
        .ok_or_else(|| ExchangeError::NoPosition(instrument.to_string()))
}

/// Size to close: the requested amount, or the whole position.
/// Requests above the held size are rejected without placing an order.
pub fn close_size(position: &Position, requested: Option<Decimal>) -> Result<Decimal, ExchangeError> {
    let held = position.size.abs();
    match requested {
        None => Ok(held),
        Some(size) if size <= Decimal::ZERO => Err(ExchangeError::InvalidParameters(format!(
            "Close size must be positive, got {}",
            size
        ))),
        Some(size) if size > held => Err(ExchangeError::SizeValidation {
            requested: size,
            held,
        }),
        Some(size) => Ok(size),
    }
}

impl<C: ExchangeConnector> Orchestrator<C> {
    /// Reduce-only IOC order on the opposite side of the current position
    #[instrument(skip(self, request), fields(instrument = %request.instrument))]
    pub async fn close(&self, request: ClosePositionRequest) -> Result<OrderAck, ExchangeError> {
        let slippage = resolve_slippage(request.slippage)?;
        let position = find_open_position(self.connector(), &request.instrument).await?;
        let size = close_size(&position, request.size)?;

        let ack = self
            .market_order(
                &request.instrument,
                position.side().opposite(),
                size,
                slippage,
                true,
            )
            .await?;
        info!(order_id = %ack.order_id, %size, "Close order accepted");
        Ok(ack)
    }

    /// Close every open position one after another. Individual failures are
    /// reported per instrument; only failing to read positions fails the batch.
    #[instrument(skip(self))]
    pub async fn close_all(&self, slippage: Option<Decimal>) -> Result<CloseAllResult, ExchangeError> {
        resolve_slippage(slippage)?;
        let open: Vec<Position> = self
            .connector()
            .get_positions()
            .await?
            .into_iter()
            .filter(Position::is_open)
            .collect();

        if open.is_empty() {
            return Ok(CloseAllResult {
                results: Vec::new(),
                closed: 0,
                failed: 0,
                message: Some("No open positions to close".to_string()),
            });
        }

        let mut results = Vec::with_capacity(open.len());
        for position in open {
            let request = ClosePositionRequest {
                instrument: position.instrument.clone(),
                size: None,
                slippage,
            };
            let result: ResultEnvelope<OrderAck> = self.close(request).await.into();
            if let Some(error) = &result.error {
                warn!(instrument = %position.instrument, %error, "Failed to close position");
            }
            results.push(CloseOutcome {
                instrument: position.instrument,
                result,
            });
        }

        let closed = results.iter().filter(|r| r.result.success).count();
        Ok(CloseAllResult {
            failed: results.len() - closed,
            closed,
            results,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(size: Decimal) -> Position {
        Position {
            instrument: "BTC".to_string(),
            size,
            entry_price: dec!(50000),
            unrealized_pnl: dec!(0),
            leverage: None,
            liquidation_price: None,
        }
    }

    #[test]
    fn test_full_close_uses_absolute_size() {
        assert_eq!(close_size(&position(dec!(-0.05)), None).unwrap(), dec!(0.05));
    }

    #[test]
    fn test_partial_close_within_position() {
        assert_eq!(
            close_size(&position(dec!(0.05)), Some(dec!(0.02))).unwrap(),
            dec!(0.02)
        );
    }

    #[test]
    fn test_oversized_close_rejected() {
        match close_size(&position(dec!(0.05)), Some(dec!(0.1))) {
            Err(ExchangeError::SizeValidation { requested, held }) => {
                assert_eq!(requested, dec!(0.1));
                assert_eq!(held, dec!(0.05));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_close_rejected() {
        assert!(matches!(
            close_size(&position(dec!(0.05)), Some(dec!(0))),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }
}
