use anyhow::Context;
use perpgate::{ExchangeFactory, ExchangeId, MarketOperations, TradingType};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    #[cfg(feature = "env-file")]
    perpgate::core::config::load_env_file(".env")?;

    let registry = ExchangeFactory::registry_from_env().context("Failed to build exchange registry")?;
    for (exchange, trading_type) in registry.registered() {
        info!(%exchange, %trading_type, "Ready");
    }

    // perpgate <exchange> <instrument>
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [exchange, instrument] = args.as_slice() {
        let exchange: ExchangeId = exchange.parse()?;
        let bundle = registry.resolve(exchange, TradingType::Perpetual)?;
        let price = bundle.market.get_current_price(instrument).await;
        println!("{}", serde_json::to_string_pretty(&price)?);
    } else if registry.is_empty() {
        info!("No exchange credentials found in the environment");
    }

    Ok(())
}
