use super::signer::HyperliquidSigner;
use super::types::{
    Action, AllMids, BulkCancel, BulkOrder, CancelWire, ClearinghouseState, ExchangePayload,
    ExchangeResponse, HyperliquidError, InfoRequest, Meta, OpenOrder, OrderWire, UpdateLeverage,
};
use crate::core::errors::ExchangeError;
use crate::core::kernel::eth::{self, Address};
use crate::core::kernel::RestClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

const INFO_ENDPOINT: &str = "/info";
const EXCHANGE_ENDPOINT: &str = "/exchange";

/// Thin typed wrapper around `RestClient` for the `/info` and `/exchange` endpoints
#[derive(Clone)]
pub struct HyperliquidRest<R: RestClient> {
    client: R,
    signer: Option<Arc<HyperliquidSigner>>,
    /// Account whose state is queried: the vault when trading for one, else the user
    account: Option<String>,
    vault_address: Option<Address>,
}

impl<R: RestClient> HyperliquidRest<R> {
    pub fn new(client: R, signer: Option<Arc<HyperliquidSigner>>, account: Option<String>) -> Self {
        Self {
            client,
            signer,
            account,
            vault_address: None,
        }
    }

    /// Trade on behalf of a vault or subaccount; queries then target that account
    pub fn with_vault_address(mut self, vault_address: &str) -> Result<Self, ExchangeError> {
        let vault = eth::parse_address(vault_address)?;
        self.account = Some(eth::format_address(&vault));
        self.vault_address = Some(vault);
        Ok(self)
    }

    pub fn account(&self) -> Result<&str, ExchangeError> {
        self.account
            .as_deref()
            .ok_or_else(|| HyperliquidError::signer_required("account queries").into())
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    async fn info<T: DeserializeOwned + Send>(
        &self,
        request: &InfoRequest,
    ) -> Result<T, ExchangeError> {
        let body = serde_json::to_value(request).map_err(ExchangeError::JsonError)?;
        self.client.post_body_json(INFO_ENDPOINT, &body).await
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn get_meta(&self) -> Result<Meta, ExchangeError> {
        self.info(&InfoRequest::Meta).await
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn get_all_mids(&self) -> Result<AllMids, ExchangeError> {
        self.info(&InfoRequest::AllMids).await
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn get_clearinghouse_state(&self) -> Result<ClearinghouseState, ExchangeError> {
        let user = self.account()?.to_string();
        self.info(&InfoRequest::ClearinghouseState { user }).await
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn get_open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        let user = self.account()?.to_string();
        self.info(&InfoRequest::OpenOrders { user }).await
    }

    /// Sign and submit an L1 action. Nonce and signature come from one clock read.
    async fn post_action(&self, action: Action) -> Result<ExchangeResponse, ExchangeError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| HyperliquidError::signer_required("exchange actions"))?;

        let nonce = signer.next_nonce()?;
        let signature = signer.sign_l1_action(&action, self.vault_address.as_ref(), nonce)?;
        debug!(nonce, signer = %signer.address(), "Signed L1 action");

        let payload = ExchangePayload {
            action,
            nonce,
            signature,
            vault_address: self.vault_address.as_ref().map(eth::format_address),
        };
        let body = serde_json::to_value(&payload).map_err(ExchangeError::JsonError)?;
        self.client.post_body_json(EXCHANGE_ENDPOINT, &body).await
    }

    #[instrument(skip(self, orders), fields(exchange = "hyperliquid", count = orders.len()))]
    pub async fn place_orders(
        &self,
        orders: Vec<OrderWire>,
    ) -> Result<ExchangeResponse, ExchangeError> {
        self.post_action(Action::Order(BulkOrder {
            orders,
            grouping: "na".to_string(),
        }))
        .await
    }

    #[instrument(skip(self, cancels), fields(exchange = "hyperliquid", count = cancels.len()))]
    pub async fn cancel_orders(
        &self,
        cancels: Vec<CancelWire>,
    ) -> Result<ExchangeResponse, ExchangeError> {
        self.post_action(Action::Cancel(BulkCancel { cancels })).await
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn update_leverage(
        &self,
        asset: u32,
        is_cross: bool,
        leverage: u32,
    ) -> Result<ExchangeResponse, ExchangeError> {
        self.post_action(Action::UpdateLeverage(UpdateLeverage {
            asset,
            is_cross,
            leverage,
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::rest::ReqwestRest;

    fn rest() -> HyperliquidRest<ReqwestRest> {
        let client = ReqwestRest::new(
            "https://api.hyperliquid-testnet.xyz".to_string(),
            "hyperliquid".to_string(),
            None,
        )
        .unwrap();
        HyperliquidRest::new(client, None, None)
    }

    #[test]
    fn test_read_only_client_has_no_account() {
        let rest = rest();
        assert!(!rest.can_sign());
        assert!(matches!(
            rest.account(),
            Err(ExchangeError::CredentialError(_))
        ));
    }

    #[test]
    fn test_vault_becomes_queried_account() {
        let rest = rest()
            .with_vault_address("0x63DD5ACC6B1AA0F563956C0E534DD30B6DCF7C4E")
            .unwrap();
        assert_eq!(
            rest.account().unwrap(),
            "0x63dd5acc6b1aa0f563956c0e534dd30b6dcf7c4e"
        );
    }

    #[tokio::test]
    async fn test_action_without_signer_fails_before_sending() {
        let err = rest().update_leverage(0, true, 10).await.unwrap_err();
        assert!(matches!(err, ExchangeError::CredentialError(_)));
    }
}
