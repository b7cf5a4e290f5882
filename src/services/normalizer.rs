//! Provider payload -> canonical candle series.
//!
//! Output is always ascending by timestamp, in UTC, and every candle passes
//! [`Candle::check`]. One bad record rejects the whole batch.

use crate::error::MalformedData;
use crate::sources::ProviderKind;
use crate::types::Candle;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Seconds,
    Milliseconds,
}

/// Field positions of one provider's candle record.
#[derive(Debug, Clone, Copy)]
struct Layout {
    min_width: usize,
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    unit: TimeUnit,
}

fn layout(provider: ProviderKind) -> Layout {
    match provider {
        // [openTime, open, high, low, close, volume, closeTime, ...]
        ProviderKind::Binance => Layout {
            min_width: 6,
            time: 0,
            open: 1,
            high: 2,
            low: 3,
            close: 4,
            volume: Some(5),
            unit: TimeUnit::Milliseconds,
        },
        // [time, low, high, open, close, volume], newest first
        ProviderKind::Coinbase => Layout {
            min_width: 6,
            time: 0,
            open: 3,
            high: 2,
            low: 1,
            close: 4,
            volume: Some(5),
            unit: TimeUnit::Seconds,
        },
        // [time, open, high, low, close]
        ProviderKind::CoinGecko | ProviderKind::CoinMarketCap => Layout {
            min_width: 5,
            time: 0,
            open: 1,
            high: 2,
            low: 3,
            close: 4,
            volume: None,
            unit: TimeUnit::Milliseconds,
        },
    }
}

/// Normalize a raw provider response into an ascending candle series.
pub fn normalize(provider: ProviderKind, raw: &Value) -> Result<Vec<Candle>, MalformedData> {
    let fail = |reason: String| MalformedData::new(provider.as_str(), reason);
    let layout = layout(provider);

    let rows = raw
        .as_array()
        .ok_or_else(|| fail(format!("expected an array of candles, got {}", kind_of(raw))))?;

    let mut candles = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let fields = row
            .as_array()
            .filter(|f| f.len() >= layout.min_width)
            .ok_or_else(|| {
                fail(format!(
                    "record {}: expected at least {} fields",
                    i, layout.min_width
                ))
            })?;

        let number = |idx: usize, name: &str| {
            parse_number(&fields[idx])
                .ok_or_else(|| fail(format!("record {}: {} is not numeric", i, name)))
        };

        let timestamp = parse_time(&fields[layout.time], layout.unit)
            .ok_or_else(|| fail(format!("record {}: invalid timestamp", i)))?;

        let candle = Candle {
            timestamp,
            open: number(layout.open, "open")?,
            high: number(layout.high, "high")?,
            low: number(layout.low, "low")?,
            close: number(layout.close, "close")?,
            volume: match layout.volume {
                Some(idx) => number(idx, "volume")?,
                None => 0.0,
            },
        };

        candle
            .check()
            .map_err(|reason| fail(format!("record {}: {}", i, reason)))?;
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.timestamp);
    if let Some(pair) = candles.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(fail(format!("duplicate timestamp {}", pair[0].timestamp)));
    }

    Ok(candles)
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parse_time(value: &Value, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    if raw < 0 {
        return None;
    }
    match unit {
        TimeUnit::Seconds => Utc.timestamp_opt(raw, 0).single(),
        TimeUnit::Milliseconds => Utc.timestamp_millis_opt(raw).single(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
