use csv::Writer;
use pnl_core::{PositionStatus, TokenReport};
use std::io::{Cursor, Write};

use crate::{OrchestratorError, Result, WalletReport};

const HEADERS: [&str; 25] = [
    "wallet_address",
    "mint",
    "symbol",
    "name",
    "status",
    "trade_count",
    "total_buy_amount",
    "total_buy_tokens",
    "avg_buy_price",
    "total_sell_amount",
    "total_sell_tokens",
    "avg_sell_price",
    "realized_pnl",
    "realized_pnl_percent",
    "tokens_held",
    "current_price",
    "unrealized_pnl",
    "unrealized_pnl_percent",
    "max_price_after_buy",
    "max_gain_possible",
    "max_drawdown",
    "missed_gains",
    "missed_gains_percent",
    "is_roundtrip",
    "last_trade_time",
];

fn token_row(wallet_address: &str, token: &TokenReport) -> Vec<String> {
    let position = &token.position;
    let status = match token.status {
        PositionStatus::Holding => "HOLDING",
        PositionStatus::Closed => "CLOSED",
    };

    vec![
        wallet_address.to_string(),
        position.mint.clone(),
        position.symbol.clone().unwrap_or_default(),
        position.name.clone().unwrap_or_default(),
        status.to_string(),
        token.trade_count.to_string(),
        token.total_buy_amount.to_string(),
        token.total_buy_tokens.to_string(),
        token.avg_buy_price.to_string(),
        token.total_sell_amount.to_string(),
        token.total_sell_tokens.to_string(),
        token.avg_sell_price.to_string(),
        token.realized_pnl.to_string(),
        format!("{:.2}", token.realized_pnl_percent),
        token.tokens_held.to_string(),
        position
            .current_price
            .map(|p| p.to_string())
            .unwrap_or_default(),
        token.unrealized_pnl.to_string(),
        format!("{:.2}", token.unrealized_pnl_percent),
        token.max_price_after_buy.to_string(),
        format!("{:.2}", token.max_gain_possible),
        format!("{:.2}", token.max_drawdown),
        token.missed_gains.to_string(),
        format!("{:.2}", token.missed_gains_percent),
        token.is_roundtrip.to_string(),
        token
            .last_trade_time
            .map(|t| t.to_string())
            .unwrap_or_default(),
    ]
}

/// Write one CSV row per token report
pub fn write_report_csv<W: Write>(report: &WalletReport, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    wtr.write_record(HEADERS)
        .map_err(|e| OrchestratorError::Export(format!("CSV header error: {}", e)))?;

    for token in &report.tokens {
        wtr.write_record(token_row(&report.wallet_address, token))
            .map_err(|e| OrchestratorError::Export(format!("CSV write error: {}", e)))?;
    }

    wtr.flush()
        .map_err(|e| OrchestratorError::Export(format!("CSV flush error: {}", e)))?;
    Ok(())
}

pub fn report_to_csv(report: &WalletReport) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    write_report_csv(report, &mut buffer)?;

    String::from_utf8(buffer.into_inner())
        .map_err(|e| OrchestratorError::Export(format!("CSV encoding error: {}", e)))
}
