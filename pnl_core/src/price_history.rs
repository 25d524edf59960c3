use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PriceCandle, TokenPosition};

/// Price extremes observed after entry and after exit.
/// `None` means no reference price was available at all.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceExtrema {
    pub max_after_buy: Option<Decimal>,
    pub min_after_buy: Option<Decimal>,
    pub max_after_sell: Option<Decimal>,
}

impl PriceExtrema {
    /// Reported values: unknown extremes are normalized to zero
    pub fn max_after_buy_or_zero(&self) -> Decimal {
        self.max_after_buy.unwrap_or(Decimal::ZERO)
    }

    pub fn min_after_buy_or_zero(&self) -> Decimal {
        self.min_after_buy.unwrap_or(Decimal::ZERO)
    }

    pub fn max_after_sell_or_zero(&self) -> Decimal {
        self.max_after_sell.unwrap_or(Decimal::ZERO)
    }
}

fn fold_max(current: Option<Decimal>, value: Decimal) -> Option<Decimal> {
    Some(current.map_or(value, |c| c.max(value)))
}

fn fold_min(current: Option<Decimal>, value: Decimal) -> Option<Decimal> {
    Some(current.map_or(value, |c| c.min(value)))
}

/// Scans a candle series against a position's entry and exit times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceHistoryAnalyzer {
    /// Earliest buy, 0 when there are no buys (every candle qualifies)
    first_buy_time: i64,
    /// Latest sell, 0 when there are no sells (no post-exit window)
    last_sell_time: i64,
}

impl PriceHistoryAnalyzer {
    pub fn new(first_buy_time: i64, last_sell_time: i64) -> Self {
        Self {
            first_buy_time,
            last_sell_time,
        }
    }

    pub fn for_position(position: &TokenPosition) -> Self {
        Self::new(position.first_buy_time(), position.last_sell_time())
    }

    /// Single pass over the candles in whatever order they arrive.
    /// The current price seeds every extreme so the result is never worse than "now".
    pub fn scan(&self, current_price: Option<Decimal>, candles: &[PriceCandle]) -> PriceExtrema {
        let current_price = current_price.filter(|p| *p > Decimal::ZERO);

        let mut extrema = PriceExtrema {
            max_after_buy: current_price,
            min_after_buy: current_price,
            max_after_sell: current_price,
        };

        let mut after_buy = 0usize;
        let mut after_sell = 0usize;

        for candle in candles {
            if candle.timestamp > self.first_buy_time {
                extrema.max_after_buy = fold_max(extrema.max_after_buy, candle.high);
                extrema.min_after_buy = fold_min(extrema.min_after_buy, candle.low);
                after_buy += 1;
            }

            if self.last_sell_time > 0 && candle.timestamp > self.last_sell_time {
                extrema.max_after_sell = fold_max(extrema.max_after_sell, candle.high);
                after_sell += 1;
            }
        }

        debug!(
            "Scanned {} candles: {} after first buy ({}), {} after last sell ({})",
            candles.len(),
            after_buy,
            self.first_buy_time,
            after_sell,
            self.last_sell_time
        );

        extrema
    }
}
