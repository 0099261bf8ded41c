//! Aster Pro (v3) perpetuals.
//!
//! Aster exposes Binance-compatible futures routes, so the Binance-style
//! connector is reused with v3 signed endpoints and a [`WalletSigner`]
//! (EIP-191 over ABI-encoded JSON) in place of HMAC.
//!
//! [`WalletSigner`]: crate::core::kernel::WalletSigner

pub mod builder;

pub use builder::{build_connector, AsterConnector};
