//! Exchange-agnostic transport and authentication.
//!
//! The kernel knows how to encode ordered parameters, sign them and move them
//! over HTTP. It contains no venue-specific endpoints or payload shapes.
//!
//! ```rust,no_run
//! use perpgate::core::kernel::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), perpgate::ExchangeError> {
//! let signer = HmacSigner::new("api_key".to_string(), "secret_key".to_string())?;
//! let rest = RestClientBuilder::new(RestClientConfig::new(
//!     "https://fapi.binance.com".to_string(),
//!     "binance".to_string(),
//! ))
//! .with_signer(Arc::new(signer))
//! .build()?;
//!
//! let balances: serde_json::Value = rest.get_json("/fapi/v2/balance", &[], true).await?;
//! # Ok(())
//! # }
//! ```
pub mod eth;
pub mod rest;
pub mod signer;

pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{encode_params, param, HmacSigner, Params, SignedEnvelope, Signer, WalletSigner};
