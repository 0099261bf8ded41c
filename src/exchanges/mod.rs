pub mod aster;
pub mod binance_perp;
pub mod hyperliquid;
