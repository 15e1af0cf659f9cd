//! Pair filters shared by the exchange sources and the scanner.

/// Stablecoins and stable-pegged assets excluded from scanning.
pub const STABLE_COINS: &[&str] = &[
    "USDT", "USDC", "BUSD", "DAI", "TUSD", "USDP", "USDD", "FRAX", "LUSD", "SUSD", "GUSD",
    "HUSD", "USDN", "RSR", "USTC", "USDX", "CUSD", "DUSD", "MUSD", "NUSD", "OUSD", "PUSD",
    "RUSD", "VUSD", "WUSD", "XUSD", "YUSD", "ZUSD", "FDUSD", "PYUSD",
];

/// Instruments whose candle endpoints misbehave; they get no candles.
pub const PROBLEMATIC_INSTRUMENTS: &[&str] = &["SWEAT-USDT", "LUNC-USDT", "USTC-USDT"];

/// Base asset of a USDT pair (`BTCUSDT` / `BTC-USDT` → `BTC`).
pub fn base_asset(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    let stripped = upper
        .strip_suffix("-USDT")
        .or_else(|| upper.strip_suffix("USDT"))
        .unwrap_or(&upper);
    stripped.replace('-', "")
}

pub fn is_stable_coin(symbol: &str) -> bool {
    let base = base_asset(symbol);
    STABLE_COINS.contains(&base.as_str())
}

pub fn is_problematic(symbol: &str) -> bool {
    PROBLEMATIC_INSTRUMENTS.contains(&symbol)
}

/// Parse a numeric string field, treating anything unparsable as 0.
pub fn parse_number(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
