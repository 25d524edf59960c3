use config_manager::AnalysisConfig;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::price_history::PriceExtrema;
use crate::{PositionStatus, TokenPosition, TokenReport, Trade};

/// Heuristic cut-offs for the roundtrip flag and the holding status
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisThresholds {
    /// Peak after entry must exceed avg buy price times this factor
    pub roundtrip_runup_multiplier: Decimal,
    /// Positions holding at most this many tokens are closed
    pub holding_dust_threshold: Decimal,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            roundtrip_runup_multiplier: dec!(1.5),
            holding_dust_threshold: dec!(0.001),
        }
    }
}

impl From<&AnalysisConfig> for AnalysisThresholds {
    fn from(config: &AnalysisConfig) -> Self {
        let defaults = Self::default();
        Self {
            roundtrip_runup_multiplier: Decimal::from_f64(config.roundtrip_runup_multiplier)
                .unwrap_or(defaults.roundtrip_runup_multiplier),
            holding_dust_threshold: Decimal::from_f64(config.holding_dust_threshold)
                .unwrap_or(defaults.holding_dust_threshold),
        }
    }
}

/// numerator / denominator, or zero when the denominator is not positive
fn guarded_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// (value - base) / base * 100, or zero when base is not positive or the result overflows
fn percent_change(value: Decimal, base: Decimal) -> Decimal {
    value
        .checked_sub(base)
        .map(|delta| guarded_ratio(delta, base))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Unwrap a checked result; an overflowed figure is reported as zero
fn or_zero(value: Option<Decimal>, mint: &str, figure: &str) -> Decimal {
    value.unwrap_or_else(|| {
        warn!("Decimal overflow computing {} for {}; reporting 0", figure, mint);
        Decimal::ZERO
    })
}

/// (Σ stable_amount, Σ asset_amount); `None` on overflow
fn sum_amounts(trades: &[Trade]) -> (Option<Decimal>, Option<Decimal>) {
    let stable = trades
        .iter()
        .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.stable_amount));
    let asset = trades
        .iter()
        .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.asset_amount));
    (stable, asset)
}

/// Computes cost basis, PnL and opportunity-cost metrics for one position
#[derive(Debug, Clone, Default)]
pub struct PositionAnalyzer {
    thresholds: AnalysisThresholds,
}

impl PositionAnalyzer {
    pub fn new(thresholds: AnalysisThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnalysisThresholds {
        &self.thresholds
    }

    /// Build the report for a position whose metadata has already been applied.
    /// Every ratio and every overflowing figure degrades to zero instead of failing.
    pub fn analyze(&self, position: TokenPosition, extrema: &PriceExtrema) -> TokenReport {
        let mint = position.mint.as_str();

        let (buy_amount, buy_tokens) = sum_amounts(&position.buys);
        let total_buy_amount = or_zero(buy_amount, mint, "total buy amount");
        let total_buy_tokens = or_zero(buy_tokens, mint, "total buy tokens");
        let avg_buy_price = guarded_ratio(total_buy_amount, total_buy_tokens);

        let (sell_amount, sell_tokens) = sum_amounts(&position.sells);
        let total_sell_amount = or_zero(sell_amount, mint, "total sell amount");
        let total_sell_tokens = or_zero(sell_tokens, mint, "total sell tokens");
        let avg_sell_price = guarded_ratio(total_sell_amount, total_sell_tokens);

        // Proceeds minus the cost of the tokens actually sold, at average entry
        let realized_pnl = or_zero(
            total_sell_tokens
                .checked_mul(avg_buy_price)
                .and_then(|cost| total_sell_amount.checked_sub(cost)),
            mint,
            "realized PnL",
        );
        let realized_pnl_percent = if total_sell_tokens > Decimal::ZERO {
            percent_change(avg_sell_price, avg_buy_price)
        } else {
            Decimal::ZERO
        };

        let tokens_held = or_zero(
            total_buy_tokens.checked_sub(total_sell_tokens),
            mint,
            "tokens held",
        );
        let cost_basis = or_zero(tokens_held.checked_mul(avg_buy_price), mint, "cost basis");

        let (unrealized_value, unrealized_pnl, unrealized_pnl_percent) = match position.current_price
        {
            Some(price) => {
                let value = or_zero(tokens_held.checked_mul(price), mint, "unrealized value");
                let pnl = or_zero(value.checked_sub(cost_basis), mint, "unrealized PnL");
                let percent = if cost_basis > Decimal::ZERO {
                    percent_change(value, cost_basis)
                } else {
                    Decimal::ZERO
                };
                (value, pnl, percent)
            }
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };

        let max_gain_possible = extrema
            .max_after_buy
            .map_or(Decimal::ZERO, |max| percent_change(max, avg_buy_price));
        let max_drawdown = extrema
            .min_after_buy
            .map_or(Decimal::ZERO, |min| percent_change(min, avg_buy_price));

        let (missed_gains, missed_gains_percent) = match extrema.max_after_sell {
            Some(peak) if !position.sells.is_empty() && avg_sell_price > Decimal::ZERO => (
                or_zero(
                    peak.checked_sub(avg_sell_price)
                        .and_then(|gap| gap.checked_mul(total_sell_tokens)),
                    mint,
                    "missed gains",
                ),
                percent_change(peak, avg_sell_price),
            ),
            _ => (Decimal::ZERO, Decimal::ZERO),
        };

        let runup_threshold = avg_buy_price.checked_mul(self.thresholds.roundtrip_runup_multiplier);
        let ran_up = match (extrema.max_after_buy, runup_threshold) {
            (Some(max), Some(threshold)) => max > threshold,
            _ => false,
        };
        let under_entry = position
            .current_price
            .is_some_and(|price| price < avg_buy_price);
        let is_roundtrip = tokens_held > Decimal::ZERO && ran_up && under_entry;

        let status = if tokens_held > self.thresholds.holding_dust_threshold {
            PositionStatus::Holding
        } else {
            PositionStatus::Closed
        };

        debug!(
            "Analyzed {}: {} buys / {} sells, held {}, realized {}, unrealized {}, roundtrip {}",
            position.mint,
            position.buys.len(),
            position.sells.len(),
            tokens_held,
            realized_pnl,
            unrealized_pnl,
            is_roundtrip
        );

        TokenReport {
            trade_count: position.trade_count(),
            first_trade_time: position.first_trade_time(),
            last_trade_time: position.last_trade_time(),
            position,
            total_buy_amount,
            total_buy_tokens,
            avg_buy_price,
            total_sell_amount,
            total_sell_tokens,
            avg_sell_price,
            realized_pnl,
            realized_pnl_percent,
            tokens_held,
            unrealized_value,
            cost_basis,
            unrealized_pnl,
            unrealized_pnl_percent,
            max_price_after_buy: extrema.max_after_buy_or_zero(),
            min_price_after_buy: extrema.min_after_buy_or_zero(),
            max_price_after_sell: extrema.max_after_sell_or_zero(),
            max_gain_possible,
            max_drawdown,
            missed_gains,
            missed_gains_percent,
            is_roundtrip,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TradeDirection, SOL_MINT};

    fn trade(direction: TradeDirection, tokens: Decimal, stable: Decimal, timestamp: i64) -> Trade {
        Trade {
            signature: format!("{:?}-{}", direction, timestamp),
            timestamp,
            direction,
            asset_mint: "MINT".to_string(),
            asset_amount: tokens,
            stable_amount: stable,
            unit_price: stable / tokens,
            stable_mint: SOL_MINT.to_string(),
        }
    }

    fn position(trades: Vec<Trade>, current_price: Option<Decimal>) -> TokenPosition {
        let mut position = TokenPosition::new("MINT");
        for t in trades {
            position.record(t);
        }
        position.current_price = current_price;
        position
    }

    fn extrema(max_buy: Decimal, min_buy: Decimal, max_sell: Decimal) -> PriceExtrema {
        PriceExtrema {
            max_after_buy: Some(max_buy),
            min_after_buy: Some(min_buy),
            max_after_sell: Some(max_sell),
        }
    }

    #[test]
    fn test_avg_buy_price_is_amount_weighted() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(10), dec!(10), 1),
                trade(TradeDirection::Buy, dec!(990), dec!(1980), 2),
            ],
            None,
        );

        let report = PositionAnalyzer::default().analyze(p, &PriceExtrema::default());

        assert_eq!(report.total_buy_amount, dec!(1990));
        assert_eq!(report.total_buy_tokens, dec!(1000));
        assert_eq!(report.avg_buy_price, dec!(1.99));
    }

    #[test]
    fn test_fully_sold_position() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(100), dec!(100), 1),
                trade(TradeDirection::Sell, dec!(100), dec!(200), 2),
            ],
            Some(dec!(5)),
        );

        let report = PositionAnalyzer::default().analyze(p, &extrema(dec!(5), dec!(1), dec!(5)));

        assert_eq!(report.avg_buy_price, dec!(1));
        assert_eq!(report.avg_sell_price, dec!(2));
        assert_eq!(report.realized_pnl, dec!(100));
        assert_eq!(report.realized_pnl_percent, dec!(100));
        assert_eq!(report.tokens_held, Decimal::ZERO);
        assert_eq!(report.unrealized_pnl, Decimal::ZERO);
        assert_eq!(report.unrealized_value, Decimal::ZERO);
        assert_eq!(report.status, PositionStatus::Closed);
        assert!(!report.is_roundtrip);
    }

    #[test]
    fn test_closed_position_ignores_current_price() {
        for price in [None, Some(dec!(0.5)), Some(dec!(1000))] {
            let p = position(
                vec![
                    trade(TradeDirection::Buy, dec!(50), dec!(25), 1),
                    trade(TradeDirection::Sell, dec!(50), dec!(40), 2),
                ],
                price,
            );
            let report = PositionAnalyzer::default().analyze(p, &PriceExtrema::default());

            assert_eq!(report.unrealized_pnl, Decimal::ZERO);
            assert_eq!(report.status, PositionStatus::Closed);
        }
    }

    #[test]
    fn test_unrealized_pnl_on_held_position() {
        let p = position(
            vec![trade(TradeDirection::Buy, dec!(100), dec!(50), 1)],
            Some(dec!(0.75)),
        );

        let report =
            PositionAnalyzer::default().analyze(p, &extrema(dec!(1), dec!(0.25), dec!(0.75)));

        assert_eq!(report.avg_buy_price, dec!(0.5));
        assert_eq!(report.cost_basis, dec!(50));
        assert_eq!(report.unrealized_value, dec!(75));
        assert_eq!(report.unrealized_pnl, dec!(25));
        assert_eq!(report.unrealized_pnl_percent, dec!(50));
        assert_eq!(report.max_gain_possible, dec!(100));
        assert_eq!(report.max_drawdown, dec!(-50));
        assert_eq!(report.status, PositionStatus::Holding);
        // no sells: nothing missed
        assert_eq!(report.missed_gains, Decimal::ZERO);
        assert_eq!(report.missed_gains_percent, Decimal::ZERO);
    }

    #[test]
    fn test_missed_gains_after_exit() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(100), dec!(100), 1),
                trade(TradeDirection::Sell, dec!(60), dec!(90), 2),
                trade(TradeDirection::Sell, dec!(40), dec!(60), 3),
            ],
            Some(dec!(2)),
        );

        let report = PositionAnalyzer::default().analyze(p, &extrema(dec!(4), dec!(0.8), dec!(4)));

        assert_eq!(report.avg_sell_price, dec!(1.5));
        assert_eq!(report.missed_gains, dec!(250));
        assert_eq!(report.missed_gains_percent.round_dp(2), dec!(166.67));
        assert_eq!(report.max_price_after_sell, dec!(4));
    }

    #[test]
    fn test_sells_without_buys_are_tolerated() {
        let p = position(
            vec![trade(TradeDirection::Sell, dec!(10), dec!(20), 5)],
            Some(dec!(3)),
        );

        let report = PositionAnalyzer::default().analyze(p, &extrema(dec!(3), dec!(3), dec!(3)));

        assert_eq!(report.avg_buy_price, Decimal::ZERO);
        assert_eq!(report.tokens_held, dec!(-10));
        assert_eq!(report.realized_pnl, dec!(20));
        assert_eq!(report.realized_pnl_percent, Decimal::ZERO);
        assert_eq!(report.unrealized_pnl_percent, Decimal::ZERO);
        assert_eq!(report.max_gain_possible, Decimal::ZERO);
        assert_eq!(report.max_drawdown, Decimal::ZERO);
        assert_eq!(report.status, PositionStatus::Closed);
    }

    #[test]
    fn test_overflowing_amounts_degrade_to_zero() {
        // one base unit bought for 10^13 USDC, then 1.8e10 tokens sold
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(0.000000001), dec!(10000000000000), 1),
                trade(TradeDirection::Sell, dec!(18000000000), dec!(1), 2),
            ],
            Some(dec!(1)),
        );

        let report = PositionAnalyzer::default().analyze(p, &extrema(dec!(2), dec!(1), dec!(2)));

        assert_eq!(report.avg_buy_price, dec!(10000000000000000000000));
        assert_eq!(report.realized_pnl, Decimal::ZERO);
        assert_eq!(report.cost_basis, Decimal::ZERO);
        assert_eq!(report.tokens_held, dec!(-17999999999.999999999));
        assert_eq!(report.status, PositionStatus::Closed);
        assert!(!report.is_roundtrip);
    }

    #[test]
    fn test_overflowing_sum_degrades_to_zero() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(1), Decimal::MAX, 1),
                trade(TradeDirection::Buy, dec!(1), Decimal::MAX, 2),
            ],
            None,
        );

        let report = PositionAnalyzer::default().analyze(p, &PriceExtrema::default());

        assert_eq!(report.total_buy_amount, Decimal::ZERO);
        assert_eq!(report.total_buy_tokens, dec!(2));
        assert_eq!(report.avg_buy_price, Decimal::ZERO);
    }

    #[test]
    fn test_no_price_data_degrades_to_zero() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(100), dec!(10), 1),
                trade(TradeDirection::Sell, dec!(50), dec!(10), 2),
            ],
            None,
        );

        let report = PositionAnalyzer::default().analyze(p, &PriceExtrema::default());

        assert_eq!(report.position.current_price, None);
        assert_eq!(report.unrealized_value, Decimal::ZERO);
        assert_eq!(report.unrealized_pnl, Decimal::ZERO);
        assert_eq!(report.max_price_after_buy, Decimal::ZERO);
        assert_eq!(report.min_price_after_buy, Decimal::ZERO);
        assert_eq!(report.max_gain_possible, Decimal::ZERO);
        assert_eq!(report.max_drawdown, Decimal::ZERO);
        assert_eq!(report.missed_gains, Decimal::ZERO);
        assert_eq!(report.missed_gains_percent, Decimal::ZERO);
        assert!(!report.is_roundtrip);
        // realized PnL only depends on the trades
        assert_eq!(report.realized_pnl, dec!(5));
    }

    fn roundtrip_case(held: bool, peak: Decimal, current: Decimal) -> bool {
        let mut trades = vec![trade(TradeDirection::Buy, dec!(100), dec!(100), 1)];
        if !held {
            trades.push(trade(TradeDirection::Sell, dec!(100), dec!(80), 2));
        }
        let p = position(trades, Some(current));
        PositionAnalyzer::default()
            .analyze(p, &extrema(peak, dec!(0.5), current))
            .is_roundtrip
    }

    #[test]
    fn test_roundtrip_requires_all_three_conditions() {
        assert!(roundtrip_case(true, dec!(1.6), dec!(0.9)));

        // position closed
        assert!(!roundtrip_case(false, dec!(1.6), dec!(0.9)));
        // never ran up past 1.5x
        assert!(!roundtrip_case(true, dec!(1.5), dec!(0.9)));
        // still above entry
        assert!(!roundtrip_case(true, dec!(1.6), dec!(1)));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let analyzer = PositionAnalyzer::new(AnalysisThresholds {
            roundtrip_runup_multiplier: dec!(3),
            holding_dust_threshold: dec!(5),
        });

        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(100), dec!(100), 1),
                trade(TradeDirection::Sell, dec!(96), dec!(90), 2),
            ],
            Some(dec!(0.5)),
        );
        let report = analyzer.analyze(p, &extrema(dec!(2), dec!(0.5), dec!(2)));

        assert_eq!(report.tokens_held, dec!(4));
        assert_eq!(report.status, PositionStatus::Closed);
        assert!(!report.is_roundtrip);
    }

    #[test]
    fn test_dust_below_threshold_is_closed() {
        let p = position(
            vec![
                trade(TradeDirection::Buy, dec!(100), dec!(100), 1),
                trade(TradeDirection::Sell, dec!(99.9995), dec!(120), 2),
            ],
            Some(dec!(1)),
        );
        let report = PositionAnalyzer::default().analyze(p, &PriceExtrema::default());

        assert_eq!(report.tokens_held, dec!(0.0005));
        assert_eq!(report.status, PositionStatus::Closed);
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = AnalysisConfig {
            roundtrip_runup_multiplier: 2.0,
            holding_dust_threshold: 0.01,
        };
        let thresholds = AnalysisThresholds::from(&config);

        assert_eq!(thresholds.roundtrip_runup_multiplier, dec!(2));
        assert_eq!(thresholds.holding_dust_threshold, dec!(0.01));
    }
}
