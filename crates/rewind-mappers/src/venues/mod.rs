//! One mapper per venue protocol.

mod ascendex;
mod binance;
mod bitfinex;
mod bitflyer;
mod bitmex;
mod bitstamp;
mod blockchain_com;
mod bybit;
mod coinbase;
mod cryptocom;
mod delta;
mod deribit;
mod dydx;
mod gateio;
mod hitbtc;
mod huobi;
mod hyperliquid;
mod kraken;
mod kucoin;
mod okex;
mod phemex;
mod poloniex;
mod serum;
mod upbit;
mod woox;

pub use ascendex::Ascendex;
pub use binance::{Binance, BinanceDex};
pub use bitfinex::Bitfinex;
pub use bitflyer::Bitflyer;
pub use bitmex::Bitmex;
pub use bitstamp::Bitstamp;
pub use blockchain_com::BlockchainCom;
pub use bybit::{Bybit, BybitSpot, V5_SPOT_CUTOVER};
pub use coinbase::{Bitnomial, Coinbase, CoinbaseInternational, Gemini};
pub use cryptocom::CryptoCom;
pub use delta::Delta;
pub use deribit::Deribit;
pub use dydx::Dydx;
pub use gateio::{GateIo, GateIoFutures};
pub use hitbtc::Hitbtc;
pub use huobi::Huobi;
pub use hyperliquid::Hyperliquid;
pub use kraken::{Cryptofacilities, Kraken};
pub use kucoin::Kucoin;
pub use okex::{Ftx, Okex};
pub use phemex::Phemex;
pub use poloniex::Poloniex;
pub use serum::Serum;
pub use upbit::Upbit;
pub use woox::WooX;
