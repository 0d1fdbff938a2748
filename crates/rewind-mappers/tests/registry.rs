//! Registry-level behavior across venues.

use chrono::{TimeZone, Utc};
use rewind_core::Filter;
use rewind_mappers::{SUPPORTED_EXCHANGES, mapper_for};
use serde_json::json;

fn window_start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap()
}

#[test]
fn family_members_share_protocols() {
    let binance = json!({"method": "SUBSCRIBE", "params": ["btcusdt@aggTrade"]});
    for venue in ["binance", "binance-futures", "binance-us", "binance-options"] {
        let mapper = mapper_for(venue).unwrap();
        assert!(mapper.can_handle(&binance, window_start()), "{venue}");
        assert_eq!(
            mapper.map(&binance, window_start()).unwrap(),
            vec![Filter::with_symbols("aggTrade", ["btcusdt"])]
        );
    }
}

#[test]
fn okx_and_bitget_accept_object_args() {
    let msg = json!({"op": "subscribe", "args": [{"channel": "trades", "instId": "BTC-USDT"}]});
    for venue in ["okex", "okex-swap", "bitget", "bitget-futures"] {
        assert_eq!(
            mapper_for(venue).unwrap().map(&msg, window_start()).unwrap(),
            vec![Filter::with_symbols("trades", ["BTC-USDT"])]
        );
    }
}

#[test]
fn coinflex_uses_colon_args() {
    let msg = json!({"op": "subscribe", "args": ["futures/depth:BTC-USD-SWAP-LIN"]});
    assert_eq!(
        mapper_for("coinflex").unwrap().map(&msg, window_start()).unwrap(),
        vec![Filter::with_symbols("futures/depth", ["BTC-USD-SWAP-LIN"])]
    );
}

#[test]
fn mappers_never_panic_on_arbitrary_json() {
    let inputs = [
        json!(null),
        json!(42),
        json!("subscribe"),
        json!([]),
        json!([1, "a", null]),
        json!({}),
        json!({"op": "subscribe"}),
        json!({"op": "subscribe", "args": 5}),
        json!({"type": "subscribe", "channels": [7]}),
        json!({"method": "subscribe", "params": null}),
        json!({"method": "SUBSCRIBE", "params": [{"a": 1}]}),
        json!({"event": "subscribe", "data": []}),
        json!({"sub": 5}),
        json!({"op": "sub", "ch": 1}),
    ];
    for venue in SUPPORTED_EXCHANGES {
        let mapper = mapper_for(venue).unwrap();
        for input in &inputs {
            if mapper.can_handle(input, window_start()) {
                let _ = mapper.map(input, window_start());
            }
        }
    }
}

#[test]
fn star_atlas_and_mango_are_serum_relays() {
    let msg = json!({"op": "subscribe", "channel": "level1", "markets": ["ATLAS/USDC"]});
    for venue in ["serum", "star-atlas", "mango"] {
        assert_eq!(
            mapper_for(venue).unwrap().map(&msg, window_start()).unwrap(),
            vec![Filter::with_symbols("quote", ["ATLAS/USDC"])]
        );
    }
}

#[test]
fn bybit_spot_branches_on_window_start() {
    let mapper = mapper_for("bybit-spot").unwrap();
    let legacy = json!({"topic": "trade", "event": "sub", "params": {"symbol": "BTCUSDT"}});
    let late = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert!(mapper.can_handle(&legacy, window_start()));
    assert!(!mapper.can_handle(&legacy, late));
}
