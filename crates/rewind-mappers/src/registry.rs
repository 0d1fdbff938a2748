//! Venue name → mapper lookup.

use crate::mapper::SubscriptionMapper;
use crate::venues::{
    Ascendex, Binance, BinanceDex, Bitfinex, Bitflyer, Bitmex, Bitnomial, Bitstamp,
    BlockchainCom, Bybit, BybitSpot, Coinbase, CoinbaseInternational, CryptoCom,
    Cryptofacilities, Delta, Deribit, Dydx, Ftx, GateIo, GateIoFutures, Gemini, Hitbtc, Huobi,
    Hyperliquid, Kraken, Kucoin, Okex, Phemex, Poloniex, Serum, Upbit, WooX,
};

/// Every venue with a subscription mapper.
pub const SUPPORTED_EXCHANGES: &[&str] = &[
    "bitmex",
    "coinbase",
    "deribit",
    "cryptofacilities",
    "bitstamp",
    "okex",
    "okex-futures",
    "okex-swap",
    "okex-options",
    "okex-spreads",
    "okcoin",
    "ftx",
    "ftx-us",
    "kraken",
    "bitflyer",
    "gemini",
    "binance",
    "binance-futures",
    "binance-delivery",
    "binance-jersey",
    "binance-us",
    "binance-options",
    "binance-european-options",
    "binance-dex",
    "huobi",
    "huobi-dm",
    "huobi-dm-swap",
    "huobi-dm-linear-swap",
    "huobi-dm-options",
    "bybit",
    "bybit-options",
    "bybit-spot",
    "bitfinex",
    "bitfinex-derivatives",
    "hitbtc",
    "coinflex",
    "phemex",
    "delta",
    "gate-io",
    "gate-io-futures",
    "poloniex",
    "ascendex",
    "dydx",
    "dydx-v4",
    "upbit",
    "serum",
    "star-atlas",
    "mango",
    "crypto-com",
    "crypto-com-derivatives",
    "kucoin",
    "kucoin-futures",
    "bitnomial",
    "woo-x",
    "blockchain-com",
    "bitget",
    "bitget-futures",
    "coinbase-international",
    "hyperliquid",
];

/// The mapper for `exchange`, or `None` when the venue is not supported.
pub fn mapper_for(exchange: &str) -> Option<&'static dyn SubscriptionMapper> {
    let mapper: &'static dyn SubscriptionMapper = match exchange {
        "bitmex" => &Bitmex,
        "coinbase" => &Coinbase,
        "deribit" => &Deribit,
        "cryptofacilities" => &Cryptofacilities,
        "bitstamp" => &Bitstamp,
        "okex" | "okex-futures" | "okex-swap" | "okex-options" | "okex-spreads" | "okcoin"
        | "coinflex" | "bitget" | "bitget-futures" => &Okex,
        "ftx" | "ftx-us" => &Ftx,
        "kraken" => &Kraken,
        "bitflyer" => &Bitflyer,
        "gemini" => &Gemini,
        "binance"
        | "binance-futures"
        | "binance-delivery"
        | "binance-jersey"
        | "binance-us"
        | "binance-options"
        | "binance-european-options" => &Binance,
        "binance-dex" => &BinanceDex,
        "huobi" | "huobi-dm" | "huobi-dm-swap" | "huobi-dm-linear-swap" | "huobi-dm-options" => {
            &Huobi
        }
        "bybit" | "bybit-options" => &Bybit,
        "bybit-spot" => &BybitSpot,
        "bitfinex" | "bitfinex-derivatives" => &Bitfinex,
        "hitbtc" => &Hitbtc,
        "phemex" => &Phemex,
        "delta" => &Delta,
        "gate-io" => &GateIo,
        "gate-io-futures" => &GateIoFutures,
        "poloniex" => &Poloniex,
        "ascendex" => &Ascendex,
        "dydx" | "dydx-v4" => &Dydx,
        "upbit" => &Upbit,
        "serum" | "star-atlas" | "mango" => &Serum,
        "crypto-com" | "crypto-com-derivatives" => &CryptoCom,
        "kucoin" | "kucoin-futures" => &Kucoin,
        "bitnomial" => &Bitnomial,
        "woo-x" => &WooX,
        "blockchain-com" => &BlockchainCom,
        "coinbase-international" => &CoinbaseInternational,
        "hyperliquid" => &Hyperliquid,
        _ => return None,
    };
    Some(mapper)
}

/// Whether `exchange` has a mapper.
pub fn is_supported(exchange: &str) -> bool {
    mapper_for(exchange).is_some()
}
