use mockito::{Matcher, Server, ServerGuard};
use perpgate::exchanges::{aster, binance_perp};
use perpgate::{
    AccountInfo, ExchangeConfig, ExchangeError, MarketDataSource, OrderKind, OrderParameters,
    OrderPlacer, OrderSide, OrderStatus,
};
use rust_decimal_macros::dec;

const EXCHANGE_INFO: &str = r#"{
    "timezone": "UTC",
    "symbols": [
        {
            "symbol": "BTCUSDT",
            "status": "TRADING",
            "pricePrecision": 2,
            "quantityPrecision": 3,
            "filters": [
                {"filterType": "PRICE_FILTER", "tickSize": "0.10", "minPrice": "556.80"},
                {"filterType": "LOT_SIZE", "stepSize": "0.001", "minQty": "0.001"}
            ]
        }
    ]
}"#;

const SIGNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const SIGNER_ADDRESS: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";
const USER_ADDRESS: &str = "0x63dd5acc6b1aa0f563956c0e534dd30b6dcf7c4e";

fn binance_config(server: &ServerGuard) -> ExchangeConfig {
    ExchangeConfig::new("key".to_string(), "secret".to_string()).base_url(server.url())
}

async fn mock_exchange_info(server: &mut ServerGuard, path: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(EXCHANGE_INFO)
        .create_async()
        .await
}

#[cfg(test)]
mod binance_tests {
    use super::*;

    #[tokio::test]
    async fn test_current_price_from_ticker() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/fapi/v1/ticker/price")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_body(r#"{"symbol":"BTCUSDT","price":"50000.10","time":1700000000000}"#)
            .create_async()
            .await;

        let connector = binance_perp::build_connector(
            &ExchangeConfig::read_only().base_url(server.url()),
        )
        .unwrap();
        let price = connector.get_current_price("BTCUSDT").await.unwrap();

        mock.assert_async().await;
        assert_eq!(price, dec!(50000.10));
    }

    #[tokio::test]
    async fn test_metadata_uses_filters_and_brackets() {
        let mut server = Server::new_async().await;
        mock_exchange_info(&mut server, "/fapi/v1/exchangeInfo").await;
        server
            .mock("GET", "/fapi/v1/leverageBracket")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"symbol":"BTCUSDT","brackets":[
                    {"bracket":1,"initialLeverage":125,"notionalCap":50000},
                    {"bracket":2,"initialLeverage":100,"notionalCap":250000}
                ]}]"#,
            )
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let metadata = connector.get_asset_metadata("BTCUSDT").await.unwrap();

        assert_eq!(metadata.size_decimals, 3);
        assert_eq!(metadata.price_decimals, 1);
        assert_eq!(metadata.max_leverage, 125);
    }

    #[tokio::test]
    async fn test_market_order_is_signed_ioc_limit() {
        let mut server = Server::new_async().await;
        mock_exchange_info(&mut server, "/fapi/v1/exchangeInfo").await;
        let order = server
            .mock("POST", "/fapi/v1/order")
            .match_header("X-MBX-APIKEY", "key")
            .match_body(Matcher::Regex(
                r"^symbol=BTCUSDT&side=BUY&type=LIMIT&timeInForce=IOC&quantity=0\.01&price=52500&newOrderRespType=RESULT&recvWindow=5000&timestamp=\d+&signature=[0-9a-f]{64}$"
                    .to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"orderId":4051,"symbol":"BTCUSDT","status":"FILLED","executedQty":"0.010",
                    "avgPrice":"50010.5","side":"BUY","type":"LIMIT"}"#,
            )
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let ack = connector
            .place_order(OrderParameters::market(
                "BTCUSDT",
                OrderSide::Buy,
                dec!(0.0100),
                dec!(52500.00),
            ))
            .await
            .unwrap();

        order.assert_async().await;
        assert_eq!(ack.order_id, "4051");
        assert_eq!(
            ack.status,
            OrderStatus::Filled {
                filled_size: dec!(0.01),
                average_price: dec!(50010.5),
            }
        );
    }

    #[tokio::test]
    async fn test_stop_loss_is_reduce_only_stop_market() {
        let mut server = Server::new_async().await;
        mock_exchange_info(&mut server, "/fapi/v1/exchangeInfo").await;
        let order = server
            .mock("POST", "/fapi/v1/order")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("type=STOP_MARKET".to_string()),
                Matcher::Regex("stopPrice=49500&".to_string()),
                Matcher::Regex("reduceOnly=true".to_string()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"orderId":4052,"symbol":"BTCUSDT","status":"NEW","executedQty":"0",
                    "avgPrice":"0","side":"SELL","type":"STOP_MARKET"}"#,
            )
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let ack = connector
            .place_order(OrderParameters::trigger(
                "BTCUSDT",
                OrderSide::Sell,
                dec!(0.01),
                OrderKind::StopLoss {
                    trigger_price: dec!(49500),
                },
                dec!(47025),
            ))
            .await
            .unwrap();

        order.assert_async().await;
        assert_eq!(ack.status, OrderStatus::Resting);
    }

    #[tokio::test]
    async fn test_venue_rejection_keeps_message() {
        let mut server = Server::new_async().await;
        mock_exchange_info(&mut server, "/fapi/v1/exchangeInfo").await;
        server
            .mock("POST", "/fapi/v1/order")
            .with_status(400)
            .with_body(r#"{"code":-2019,"msg":"Margin is insufficient."}"#)
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let err = connector
            .place_order(OrderParameters::market(
                "BTCUSDT",
                OrderSide::Buy,
                dec!(0.01),
                dec!(52500),
            ))
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Margin is insufficient.");
    }

    #[tokio::test]
    async fn test_set_leverage_tolerates_unchanged_margin_type() {
        let mut server = Server::new_async().await;
        let margin = server
            .mock("POST", "/fapi/v1/marginType")
            .match_body(Matcher::Regex("marginType=CROSSED".to_string()))
            .with_status(400)
            .with_body(r#"{"code":-4046,"msg":"No need to change margin type."}"#)
            .create_async()
            .await;
        let leverage = server
            .mock("POST", "/fapi/v1/leverage")
            .match_body(Matcher::Regex("^symbol=BTCUSDT&leverage=10&".to_string()))
            .with_status(200)
            .with_body(r#"{"leverage":10,"maxNotionalValue":"1000000","symbol":"BTCUSDT"}"#)
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        connector.set_leverage("BTCUSDT", 10, true).await.unwrap();

        margin.assert_async().await;
        leverage.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_leverage_applies_when_margin_type_is_locked() {
        let mut server = Server::new_async().await;
        let margin = server
            .mock("POST", "/fapi/v1/marginType")
            .match_body(Matcher::Regex("marginType=ISOLATED".to_string()))
            .with_status(400)
            .with_body(
                r#"{"code":-4048,"msg":"Margin type cannot be changed if there exists position."}"#,
            )
            .create_async()
            .await;
        let leverage = server
            .mock("POST", "/fapi/v1/leverage")
            .match_body(Matcher::Regex("^symbol=BTCUSDT&leverage=7&".to_string()))
            .with_status(200)
            .with_body(r#"{"leverage":7,"maxNotionalValue":"1000000","symbol":"BTCUSDT"}"#)
            .expect(1)
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let err = connector
            .set_leverage("BTCUSDT", 7, false)
            .await
            .unwrap_err();

        margin.assert_async().await;
        leverage.assert_async().await;
        assert!(err.is_rejection());
        assert!(err.to_string().contains("Margin type cannot be changed"));
    }

    #[tokio::test]
    async fn test_exchange_info_is_read_once_per_symbol() {
        let mut server = Server::new_async().await;
        let info = server
            .mock("GET", "/fapi/v1/exchangeInfo")
            .with_status(200)
            .with_body(EXCHANGE_INFO)
            .expect(1)
            .create_async()
            .await;
        let order = server
            .mock("POST", "/fapi/v1/order")
            .with_status(200)
            .with_body(
                r#"{"orderId":4060,"symbol":"BTCUSDT","status":"NEW","executedQty":"0",
                    "avgPrice":"0","side":"BUY","type":"LIMIT"}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        for _ in 0..2 {
            connector
                .place_order(OrderParameters::market(
                    "BTCUSDT",
                    OrderSide::Buy,
                    dec!(0.01),
                    dec!(52500),
                ))
                .await
                .unwrap();
        }

        info.assert_async().await;
        order.assert_async().await;
    }

    #[tokio::test]
    async fn test_positions_skip_flat_symbols() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/fapi/v2/positionRisk")
            .match_query(Matcher::Regex(r"timestamp=\d+&signature=".to_string()))
            .with_status(200)
            .with_body(
                r#"[
                    {"symbol":"BTCUSDT","positionAmt":"-0.050","entryPrice":"50000.0",
                     "unRealizedProfit":"12.5","liquidationPrice":"61000.2","leverage":"5"},
                    {"symbol":"ETHUSDT","positionAmt":"0.000","entryPrice":"0.0",
                     "unRealizedProfit":"0.0","liquidationPrice":"0","leverage":"20"}
                ]"#,
            )
            .create_async()
            .await;

        let connector = binance_perp::build_connector(&binance_config(&server)).unwrap();
        let positions = connector.get_positions().await.unwrap();

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].instrument, "BTCUSDT");
        assert_eq!(positions[0].size, dec!(-0.05));
        assert_eq!(positions[0].side(), OrderSide::Sell);
    }

    #[tokio::test]
    async fn test_read_only_connector_refuses_signed_calls() {
        let server = Server::new_async().await;
        let connector = binance_perp::build_connector(
            &ExchangeConfig::read_only().base_url(server.url()),
        )
        .unwrap();

        assert!(matches!(
            connector.get_positions().await,
            Err(ExchangeError::CredentialError(_))
        ));
    }
}

#[cfg(test)]
mod aster_tests {
    use super::*;

    fn aster_config(server: &ServerGuard) -> ExchangeConfig {
        ExchangeConfig::wallet(
            USER_ADDRESS.to_string(),
            Some(SIGNER_ADDRESS.to_string()),
            SIGNER_KEY.to_string(),
        )
        .base_url(server.url())
    }

    #[tokio::test]
    async fn test_order_carries_wallet_signature() {
        let mut server = Server::new_async().await;
        mock_exchange_info(&mut server, "/fapi/v1/exchangeInfo").await;
        let order = server
            .mock("POST", "/fapi/v3/order")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r"^symbol=BTCUSDT&side=SELL&type=LIMIT".to_string()),
                Matcher::Regex(r"&recvWindow=5000&timestamp=\d+&nonce=\d+&".to_string()),
                Matcher::Regex(format!("&user={}&signer={}&", USER_ADDRESS, SIGNER_ADDRESS)),
                Matcher::Regex(r"&signature=0x[0-9a-f]{130}$".to_string()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"orderId":88,"symbol":"BTCUSDT","status":"NEW","executedQty":"0",
                    "avgPrice":"0.00000","side":"SELL","type":"LIMIT"}"#,
            )
            .create_async()
            .await;

        let connector = aster::build_connector(&aster_config(&server)).unwrap();
        let ack = connector
            .place_order(OrderParameters::market(
                "BTCUSDT",
                OrderSide::Sell,
                dec!(0.5),
                dec!(47500),
            ))
            .await
            .unwrap();

        order.assert_async().await;
        assert_eq!(ack.order_id, "88");
        assert_eq!(ack.status, OrderStatus::Resting);
    }

    #[tokio::test]
    async fn test_balances_drop_empty_assets() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/fapi/v3/balance")
            .match_query(Matcher::Regex(r"signature=0x[0-9a-f]{130}".to_string()))
            .with_status(200)
            .with_body(
                r#"[
                    {"asset":"USDT","balance":"1520.33","availableBalance":"1400.10"},
                    {"asset":"BNB","balance":"0.00000000","availableBalance":"0.00000000"}
                ]"#,
            )
            .create_async()
            .await;

        let connector = aster::build_connector(&aster_config(&server)).unwrap();
        let balances = connector.get_account_balance().await.unwrap();

        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].asset, "USDT");
        assert_eq!(balances[0].available, dec!(1400.10));
    }
}
