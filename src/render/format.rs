//! Dedicated formatters for known result shapes
//!
//! Precision is fixed per kind of figure:
//! - generic numbers: 3 decimals (`1234.500`)
//! - USD: 2 decimals from $1,000 up, 4 decimals from $1, 6 decimals below
//! - percentages: 2 decimals, signed for changes (`+2.50%`)
//! - pool reserves: 4 decimals with thousands separators
//! - spot prices: 6 decimals

use crate::tokens::SymbolTable;
use serde_json::Value;
use std::fmt::Write;

pub const NO_DATA: &str = "No data";
pub const NO_DATA_AVAILABLE: &str = "No data available";

pub fn format_number(value: f64) -> String {
    format!("{:.3}", value)
}

pub fn format_usd(value: f64) -> String {
    let magnitude = value.abs();
    let digits = if magnitude >= 1000.0 {
        group_thousands(&format!("{:.2}", magnitude))
    } else if magnitude >= 1.0 {
        format!("{:.4}", magnitude)
    } else {
        format!("{:.6}", magnitude)
    };
    if value < 0.0 {
        format!("-${}", digits)
    } else {
        format!("${}", digits)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

pub fn format_signed_percent(value: f64) -> String {
    format!("{:+.2}%", value)
}

pub fn format_reserve(value: f64) -> String {
    let digits = group_thousands(&format!("{:.4}", value.abs()));
    if value < 0.0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

pub fn format_spot(value: f64) -> String {
    format!("{:.6}", value)
}

/// Insert `,` every three digits of the integer part of an unsigned decimal
fn group_thousands(digits: &str) -> String {
    let (integer, fraction) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let mut grouped = String::with_capacity(digits.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// `0x5eb2...ca78`
pub fn short_id(id: &str) -> String {
    if id.len() > 16 && id.is_ascii() {
        format!("{}...{}", &id[..6], &id[id.len() - 4..])
    } else {
        id.to_string()
    }
}

/// Pretty JSON, the fallback for anything without a dedicated layout
pub fn dump(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `SUI: $1.2300 (+2.50%)`
pub fn format_priced_asset(label: &str, value: &Value) -> Option<String> {
    let current = value.get("current")?.as_f64()?;
    let line = match value.get("priceChange24h").and_then(Value::as_f64) {
        Some(change) => format!(
            "{}: {} ({})",
            label,
            format_usd(current),
            format_signed_percent(change)
        ),
        None => format!("{}: {}", label, format_usd(current)),
    };
    Some(line)
}

/// One line per asset of an id → price map
pub fn format_priced_asset_map(value: &Value, symbols: &SymbolTable) -> Option<String> {
    let entries = value.as_object()?;
    if entries.is_empty() {
        return Some(NO_DATA.to_string());
    }
    let lines = entries
        .iter()
        .map(|(id, price)| {
            let label = symbols.display_name(id);
            format_priced_asset(&label, price).unwrap_or_else(|| format!("{}: {}", label, dump(price)))
        })
        .collect::<Vec<_>>();
    Some(lines.join("\n"))
}

fn pair_name(pool: &Value, symbols: &SymbolTable) -> String {
    pool.get("tokens")
        .and_then(Value::as_array)
        .map(|tokens| {
            tokens
                .iter()
                .filter_map(Value::as_str)
                .map(|id| symbols.display_name(id))
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|pair| !pair.is_empty())
        .unwrap_or_else(|| "?".to_string())
}

/// Pool header, key figures, then a token/reserve table
pub fn format_pool(pool: &Value, symbols: &SymbolTable) -> Option<String> {
    let id = pool.get("id")?.as_str()?;
    let tokens = pool.get("tokens")?.as_array()?;
    let reserves = pool.get("reserves").and_then(Value::as_array);

    let mut out = String::new();
    let _ = writeln!(out, "Pool {} ({})", pair_name(pool, symbols), short_id(id));
    if let Some(fee) = pool.get("fee").and_then(Value::as_f64) {
        let _ = writeln!(out, "  Fee: {}", format_percent(fee));
    }
    if let Some(tvl) = pool.get("tvl").and_then(Value::as_f64) {
        let _ = writeln!(out, "  TVL: {}", format_usd(tvl));
    }
    if let Some(apr) = pool.get("apr").and_then(Value::as_f64) {
        let _ = writeln!(out, "  APR: {}", format_percent(apr));
    }
    let _ = write!(out, "  {:<8} {:>18}", "Token", "Reserve");
    for (i, token) in tokens.iter().enumerate() {
        let name = token
            .as_str()
            .map(|id| symbols.display_name(id))
            .unwrap_or_else(|| token.to_string());
        let reserve = reserves
            .and_then(|r| r.get(i))
            .and_then(Value::as_f64)
            .map(format_reserve)
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(out, "\n  {:<8} {:>18}", name, reserve);
    }
    Some(out)
}

/// Ranked one-line-per-pool summary
pub fn format_pool_list(pools: &Value, symbols: &SymbolTable) -> Option<String> {
    let pools = pools.as_array()?;
    if pools.is_empty() {
        return Some("No pools found".to_string());
    }
    let lines = pools
        .iter()
        .enumerate()
        .map(|(i, pool)| {
            let figure = |field: &str, fmt: fn(f64) -> String| {
                pool.get(field)
                    .and_then(Value::as_f64)
                    .map(fmt)
                    .unwrap_or_else(|| "-".to_string())
            };
            format!(
                "{}. {}  TVL: {}  APR: {}  Fee: {}",
                i + 1,
                pair_name(pool, symbols),
                figure("tvl", format_usd),
                figure("apr", format_percent),
                figure("fee", format_percent)
            )
        })
        .collect::<Vec<_>>();
    Some(lines.join("\n"))
}

/// `1 SUI = 1.229175 USDC`, labelled from the dispatched input
pub fn format_spot_price(input: &Value, price: &Value, symbols: &SymbolTable) -> Option<String> {
    let price = price.as_f64()?;
    let name = |field: &str| {
        input
            .get(field)
            .and_then(Value::as_str)
            .map(|id| symbols.display_name(id))
            .unwrap_or_else(|| field.to_string())
    };
    let mut line = format!("1 {} = {} {}", name("coin_in"), format_spot(price), name("coin_out"));
    if input.get("with_fees").and_then(Value::as_bool) == Some(false) {
        line.push_str(" (before fees)");
    }
    Some(line)
}
