use super::{resolve_slippage, slipped_price, validate_leverage, Orchestrator};
use crate::core::errors::ExchangeError;
use crate::core::traits::ExchangeConnector;
use crate::core::types::{
    AssetMetadata, OrderKind, OrderParameters, OrderSide, ProtectionOutcome, QuickTradeRequest,
    QuickTradeResult,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Notional exposure divided by price: `usd_value × leverage / price`
pub fn position_size(usd_value: Decimal, leverage: u32, price: Decimal) -> Decimal {
    usd_value * Decimal::from(leverage) / price
}

/// Stop-loss and take-profit trigger prices for a position opened at `price`.
///
/// Percentages are of margin, not of price: the price offset is
/// `percent / 100 / leverage`. A long stops below and takes profit above the
/// entry; a short is mirrored.
pub fn protective_prices(
    price: Decimal,
    side: OrderSide,
    leverage: u32,
    stop_loss_percent: Option<Decimal>,
    take_profit_percent: Option<Decimal>,
) -> (Option<Decimal>, Option<Decimal>) {
    let offset = |percent: Decimal| percent / HUNDRED / Decimal::from(leverage);
    let (below, above) = (
        |percent: Decimal| price * (Decimal::ONE - offset(percent)),
        |percent: Decimal| price * (Decimal::ONE + offset(percent)),
    );

    match side {
        OrderSide::Buy => (stop_loss_percent.map(below), take_profit_percent.map(above)),
        OrderSide::Sell => (stop_loss_percent.map(above), take_profit_percent.map(below)),
    }
}

fn validate_request(request: &QuickTradeRequest) -> Result<(), ExchangeError> {
    validate_leverage(request.leverage)?;
    if request.usd_value <= Decimal::ZERO {
        return Err(ExchangeError::InvalidParameters(format!(
            "USD value must be positive, got {}",
            request.usd_value
        )));
    }
    for (name, percent) in [
        ("Stop-loss percent", request.stop_loss_percent),
        ("Take-profit percent", request.take_profit_percent),
    ] {
        if let Some(percent) = percent {
            if percent <= Decimal::ZERO {
                return Err(ExchangeError::InvalidParameters(format!(
                    "{} must be positive, got {}",
                    name, percent
                )));
            }
        }
    }
    Ok(())
}

impl<C: ExchangeConnector> Orchestrator<C> {
    /// Open a leveraged position with optional protective orders.
    ///
    /// Leverage is set first and its failures only warn, as does leverage
    /// above the venue maximum. A price failure, metadata failure or entry
    /// failure aborts;
    /// once the entry is accepted, protective order failures are reported in
    /// the result and never undo the entry.
    #[instrument(skip(self, request), fields(instrument = %request.instrument, side = ?side, leverage = request.leverage))]
    pub async fn quick_trade(
        &self,
        request: QuickTradeRequest,
        side: OrderSide,
    ) -> Result<QuickTradeResult, ExchangeError> {
        validate_request(&request)?;
        let slippage = resolve_slippage(request.slippage)?;
        let instrument = request.instrument.as_str();

        let mut warnings = Vec::new();
        if let Err(e) = self
            .connector
            .set_leverage(instrument, request.leverage, request.cross_margin)
            .await
        {
            warn!(error = %e, "Failed to set leverage, continuing with current setting");
            warnings.push(e.to_string());
        }

        let price = self.fetch_price(instrument).await?;
        let metadata = self.connector.get_asset_metadata(instrument).await?;

        if request.cross_margin && metadata.isolated_only {
            info!("{} is isolated-only, switching to isolated margin", instrument);
            if let Err(e) = self
                .connector
                .set_leverage(instrument, request.leverage, false)
                .await
            {
                warn!(error = %e, "Failed to switch to isolated margin");
                warnings.push(e.to_string());
            }
        }
        if request.leverage > metadata.max_leverage {
            warn!(max_leverage = metadata.max_leverage, "Requested leverage exceeds venue maximum");
            warnings.push(format!(
                "Leverage {} exceeds maximum {} for {}",
                request.leverage, metadata.max_leverage, instrument
            ));
        }
        let leverage_warning = (!warnings.is_empty()).then(|| warnings.join("; "));

        let size = metadata.round_size(position_size(request.usd_value, request.leverage, price));
        if size.is_zero() {
            return Err(ExchangeError::InvalidParameters(format!(
                "Computed size for {} at {} rounds to zero",
                request.usd_value, price
            )));
        }
        let (stop_loss_price, take_profit_price) = protective_prices(
            price,
            side,
            request.leverage,
            request.stop_loss_percent,
            request.take_profit_percent,
        );
        let stop_loss_price = stop_loss_price.map(|p| metadata.round_price(p));
        let take_profit_price = take_profit_price.map(|p| metadata.round_price(p));
        let entry_limit_price = metadata.round_price(slipped_price(price, side, slippage));

        let entry = self
            .connector
            .place_order(OrderParameters::market(
                instrument,
                side,
                size,
                entry_limit_price,
            ))
            .await
            .map_err(|e| {
                warn!(error = %e, "Entry order failed");
                e
            })?;
        info!(order_id = %entry.order_id, %size, %price, "Entry order accepted");

        let exit_side = side.opposite();
        let (stop_loss, take_profit) = tokio::join!(
            self.protect(
                &metadata,
                exit_side,
                size,
                stop_loss_price.map(|trigger_price| OrderKind::StopLoss { trigger_price }),
                slippage,
            ),
            self.protect(
                &metadata,
                exit_side,
                size,
                take_profit_price.map(|trigger_price| OrderKind::TakeProfit { trigger_price }),
                slippage,
            ),
        );

        Ok(QuickTradeResult {
            side,
            entry,
            stop_loss,
            take_profit,
            computed_entry_price: price,
            entry_limit_price,
            computed_size: size,
            computed_stop_loss_price: stop_loss_price,
            computed_take_profit_price: take_profit_price,
            leverage_warning,
        })
    }

    async fn protect(
        &self,
        metadata: &AssetMetadata,
        side: OrderSide,
        size: Decimal,
        kind: Option<OrderKind>,
        slippage: Decimal,
    ) -> ProtectionOutcome {
        let Some(kind) = kind else {
            return ProtectionOutcome::Skipped;
        };
        let outcome = ProtectionOutcome::from(
            self.protective_order(metadata, side, size, kind, slippage)
                .await,
        );
        if let ProtectionOutcome::Failed { error } = &outcome {
            warn!(?kind, %error, "Protective order failed, position is open without it");
        }
        outcome
    }
}
