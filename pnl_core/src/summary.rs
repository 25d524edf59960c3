use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PositionStatus, TokenReport};

/// Wallet-level totals derived from the per-token reports
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    pub tokens_traded: usize,
    pub total_invested: Decimal,
    pub total_realized_pnl: Decimal,
    pub total_unrealized_pnl: Decimal,
    /// Only positive missed gains are counted
    pub total_missed_gains: Decimal,
    pub winners: usize,
    /// Percentage of tokens with a positive realized or unrealized PnL
    pub win_rate: Decimal,
    pub roundtrips: usize,
    pub holding: usize,
    pub closed: usize,
}

impl PortfolioSummary {
    pub fn from_reports(reports: &[TokenReport]) -> Self {
        let mut summary = Self {
            tokens_traded: reports.len(),
            ..Default::default()
        };

        for report in reports {
            summary.total_invested = summary.total_invested.saturating_add(report.total_buy_amount);
            summary.total_realized_pnl = summary.total_realized_pnl.saturating_add(report.realized_pnl);
            summary.total_unrealized_pnl =
                summary.total_unrealized_pnl.saturating_add(report.unrealized_pnl);
            summary.total_missed_gains = summary
                .total_missed_gains
                .saturating_add(report.missed_gains.max(Decimal::ZERO));

            if report.realized_pnl > Decimal::ZERO || report.unrealized_pnl > Decimal::ZERO {
                summary.winners += 1;
            }
            if report.is_roundtrip {
                summary.roundtrips += 1;
            }
            match report.status {
                PositionStatus::Holding => summary.holding += 1,
                PositionStatus::Closed => summary.closed += 1,
            }
        }

        if summary.tokens_traded > 0 {
            summary.win_rate = Decimal::from(summary.winners) * Decimal::ONE_HUNDRED
                / Decimal::from(summary.tokens_traded);
        }

        summary
    }

    pub fn total_pnl(&self) -> Decimal {
        self.total_realized_pnl.saturating_add(self.total_unrealized_pnl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PositionAnalyzer, PriceExtrema, TokenPosition};
    use rust_decimal_macros::dec;

    fn report(
        invested: Decimal,
        realized: Decimal,
        unrealized: Decimal,
        missed: Decimal,
        roundtrip: bool,
        status: PositionStatus,
    ) -> TokenReport {
        let mut report =
            PositionAnalyzer::default().analyze(TokenPosition::new("MINT"), &PriceExtrema::default());
        report.total_buy_amount = invested;
        report.realized_pnl = realized;
        report.unrealized_pnl = unrealized;
        report.missed_gains = missed;
        report.is_roundtrip = roundtrip;
        report.status = status;
        report
    }

    #[test]
    fn test_empty_portfolio() {
        let summary = PortfolioSummary::from_reports(&[]);
        assert_eq!(summary, PortfolioSummary::default());
        assert_eq!(summary.win_rate, Decimal::ZERO);
    }

    #[test]
    fn test_totals_and_counts() {
        let reports = vec![
            report(dec!(100), dec!(50), dec!(0), dec!(30), false, PositionStatus::Closed),
            report(dec!(200), dec!(-20), dec!(-10), dec!(-5), true, PositionStatus::Holding),
            report(dec!(10), dec!(0), dec!(4), dec!(0), false, PositionStatus::Holding),
            report(dec!(40), dec!(-40), dec!(0), dec!(12), false, PositionStatus::Closed),
        ];

        let summary = PortfolioSummary::from_reports(&reports);

        assert_eq!(summary.tokens_traded, 4);
        assert_eq!(summary.total_invested, dec!(350));
        assert_eq!(summary.total_realized_pnl, dec!(-10));
        assert_eq!(summary.total_unrealized_pnl, dec!(-6));
        assert_eq!(summary.total_pnl(), dec!(-16));
        // negative missed gains are not offset against positive ones
        assert_eq!(summary.total_missed_gains, dec!(42));
        assert_eq!(summary.winners, 2);
        assert_eq!(summary.win_rate, dec!(50));
        assert_eq!(summary.roundtrips, 1);
        assert_eq!(summary.holding, 2);
        assert_eq!(summary.closed, 2);
    }

    #[test]
    fn test_huge_totals_saturate() {
        let reports = vec![
            report(Decimal::MAX, Decimal::MAX, dec!(0), dec!(0), false, PositionStatus::Closed),
            report(dec!(1), dec!(1), dec!(0), dec!(0), false, PositionStatus::Closed),
        ];

        let summary = PortfolioSummary::from_reports(&reports);

        assert_eq!(summary.total_invested, Decimal::MAX);
        assert_eq!(summary.total_realized_pnl, Decimal::MAX);
        assert_eq!(summary.winners, 2);
    }
}
