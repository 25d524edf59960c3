use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use crate::swap_event::{NativeAmount, RawSwapEvent, TokenAmount};
use crate::{
    is_stable_or_native, AssetRef, Trade, TradeDirection, DEFAULT_TOKEN_DECIMALS,
    NATIVE_DECIMALS,
};

/// One resolved side of a swap
#[derive(Debug, Clone, PartialEq)]
pub enum SwapLeg {
    /// Native coin, amount already converted from lamports
    Native { amount: Decimal },
    /// SPL token, amount already scaled by its decimals
    Token { asset: AssetRef, amount: Decimal },
}

impl SwapLeg {
    pub fn mint(&self) -> &str {
        match self {
            SwapLeg::Native { .. } => crate::SOL_MINT,
            SwapLeg::Token { asset, .. } => &asset.mint,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            SwapLeg::Native { amount } | SwapLeg::Token { amount, .. } => *amount,
        }
    }

    pub fn is_stable_or_native(&self) -> bool {
        match self {
            SwapLeg::Native { .. } => true,
            SwapLeg::Token { asset, .. } => is_stable_or_native(&asset.mint),
        }
    }

    /// Resolve one side of a swap from its native amount and token list.
    ///
    /// The first token entry wins over a native amount on the same side.
    /// Entries past the first are ignored. A first entry without a mint leaves the side unresolved.
    pub fn resolve(native: Option<&NativeAmount>, tokens: Option<&[TokenAmount]>) -> Option<Self> {
        if let Some(token) = tokens.and_then(|list| list.first()) {
            if token.mint.is_empty() {
                return None;
            }

            let (raw, decimals) = match &token.raw_token_amount {
                Some(raw) => (
                    raw.token_amount.to_decimal(),
                    raw.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
                ),
                None => (Decimal::ZERO, DEFAULT_TOKEN_DECIMALS),
            };

            return Some(SwapLeg::Token {
                asset: AssetRef {
                    mint: token.mint.clone(),
                    decimals,
                },
                amount: scale_down(raw, decimals),
            });
        }

        native.map(|native| SwapLeg::Native {
            amount: scale_down(native.amount.to_decimal(), NATIVE_DECIMALS),
        })
    }
}

/// Divide a raw integer amount by 10^decimals; zero if the divisor overflows
fn scale_down(raw: Decimal, decimals: u32) -> Decimal {
    let divisor = (0..decimals).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(Decimal::from(10)));
    divisor
        .and_then(|d| raw.checked_div(d))
        .unwrap_or(Decimal::ZERO)
}

/// Turns raw swap records into directional trades against a stable/native asset
pub struct TransactionClassifier {
    /// Wallet the records belong to; kept for provenance in logs
    wallet_address: String,
}

impl TransactionClassifier {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    /// Classify every record, dropping the ones that are not directional trades
    pub fn classify_all(&self, events: &[RawSwapEvent]) -> Vec<Trade> {
        let trades: Vec<Trade> = events.iter().filter_map(|e| self.classify(e)).collect();

        debug!(
            "Classified {} of {} swap records as trades for wallet {}",
            trades.len(),
            events.len(),
            self.wallet_address
        );

        trades
    }

    /// Classify one record. `None` means "not a trade", never an error.
    pub fn classify(&self, event: &RawSwapEvent) -> Option<Trade> {
        let swap = event.swap()?;

        let leg_in = SwapLeg::resolve(swap.native_input.as_ref(), swap.token_inputs.as_deref());
        let leg_out = SwapLeg::resolve(swap.native_output.as_ref(), swap.token_outputs.as_deref());

        let (leg_in, leg_out) = match (leg_in, leg_out) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                trace!("Skipping {}: swap side unresolved", event.signature);
                return None;
            }
        };

        let (direction, asset_leg, stable_leg) =
            match (leg_in.is_stable_or_native(), leg_out.is_stable_or_native()) {
                (true, false) => (TradeDirection::Buy, &leg_out, &leg_in),
                (false, true) => (TradeDirection::Sell, &leg_in, &leg_out),
                _ => {
                    trace!(
                        "Skipping {}: {} -> {} is not a stable/token pair",
                        event.signature,
                        leg_in.mint(),
                        leg_out.mint()
                    );
                    return None;
                }
            };

        let asset_amount = asset_leg.amount();
        let stable_amount = stable_leg.amount();

        if asset_amount <= Decimal::ZERO || stable_amount <= Decimal::ZERO {
            warn!(
                "Skipping {}: non-positive amounts (asset {}, stable {})",
                event.signature, asset_amount, stable_amount
            );
            return None;
        }

        let unit_price = stable_amount
            .checked_div(asset_amount)
            .unwrap_or(Decimal::ZERO);

        Some(Trade {
            signature: event.signature.clone(),
            timestamp: event.timestamp,
            direction,
            asset_mint: asset_leg.mint().to_string(),
            asset_amount,
            stable_amount,
            unit_price,
            stable_mint: stable_leg.mint().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap_event::{RawAmount, RawTokenAmount, SwapEvents, SwapPayload};
    use crate::{SOL_MINT, USDC_MINT, USDT_MINT};
    use rust_decimal_macros::dec;

    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const WIF: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";

    fn native(lamports: u64) -> Option<NativeAmount> {
        Some(NativeAmount {
            account: Some("wallet".to_string()),
            amount: RawAmount::Text(lamports.to_string()),
        })
    }

    fn tokens(mint: &str, raw: &str, decimals: Option<u32>) -> Option<Vec<TokenAmount>> {
        Some(vec![TokenAmount {
            user_account: Some("wallet".to_string()),
            mint: mint.to_string(),
            raw_token_amount: Some(RawTokenAmount {
                token_amount: RawAmount::Text(raw.to_string()),
                decimals,
            }),
        }])
    }

    fn event(payload: SwapPayload) -> RawSwapEvent {
        RawSwapEvent {
            signature: "sig".to_string(),
            timestamp: 1_700_000_000,
            events: Some(SwapEvents { swap: Some(payload) }),
        }
    }

    fn classifier() -> TransactionClassifier {
        TransactionClassifier::new("wallet")
    }

    #[test]
    fn test_native_in_token_out_is_buy() {
        let trade = classifier()
            .classify(&event(SwapPayload {
                native_input: native(1_000_000_000),
                token_outputs: tokens(BONK, "1000000", Some(6)),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(trade.direction, TradeDirection::Buy);
        assert_eq!(trade.asset_mint, BONK);
        assert_eq!(trade.asset_amount, dec!(1));
        assert_eq!(trade.stable_amount, dec!(1));
        assert_eq!(trade.unit_price, dec!(1));
        assert_eq!(trade.stable_mint, SOL_MINT);
        assert_eq!(trade.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_token_in_stable_out_is_sell() {
        let trade = classifier()
            .classify(&event(SwapPayload {
                token_inputs: tokens(BONK, "500000000", Some(5)),
                token_outputs: tokens(USDC_MINT, "250000000", Some(6)),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(trade.direction, TradeDirection::Sell);
        assert_eq!(trade.asset_mint, BONK);
        assert_eq!(trade.asset_amount, dec!(5000));
        assert_eq!(trade.stable_amount, dec!(250));
        assert_eq!(trade.unit_price, dec!(0.05));
        assert_eq!(trade.stable_mint, USDC_MINT);
    }

    #[test]
    fn test_missing_swap_payload_is_discarded() {
        let no_events = RawSwapEvent {
            signature: "sig".to_string(),
            timestamp: 1,
            events: None,
        };
        assert!(classifier().classify(&no_events).is_none());

        let no_swap = RawSwapEvent {
            events: Some(SwapEvents { swap: None }),
            ..no_events
        };
        assert!(classifier().classify(&no_swap).is_none());
    }

    #[test]
    fn test_unresolved_side_is_discarded() {
        let only_input = event(SwapPayload {
            native_input: native(1_000_000_000),
            ..Default::default()
        });
        assert!(classifier().classify(&only_input).is_none());

        let only_output = event(SwapPayload {
            token_outputs: tokens(BONK, "1000", Some(0)),
            token_inputs: Some(vec![]),
            ..Default::default()
        });
        assert!(classifier().classify(&only_output).is_none());
    }

    #[test]
    fn test_stable_to_stable_is_discarded() {
        let sol_to_usdc = event(SwapPayload {
            native_input: native(1_000_000_000),
            token_outputs: tokens(USDC_MINT, "150000000", Some(6)),
            ..Default::default()
        });
        assert!(classifier().classify(&sol_to_usdc).is_none());

        let usdc_to_usdt = event(SwapPayload {
            token_inputs: tokens(USDC_MINT, "1000000", Some(6)),
            token_outputs: tokens(USDT_MINT, "1000000", Some(6)),
            ..Default::default()
        });
        assert!(classifier().classify(&usdc_to_usdt).is_none());
    }

    #[test]
    fn test_token_to_token_is_discarded() {
        let bonk_to_wif = event(SwapPayload {
            token_inputs: tokens(BONK, "100000", Some(5)),
            token_outputs: tokens(WIF, "1000000", Some(6)),
            ..Default::default()
        });
        assert!(classifier().classify(&bonk_to_wif).is_none());
    }

    #[test]
    fn test_missing_decimals_default_to_nine() {
        let trade = classifier()
            .classify(&event(SwapPayload {
                native_input: native(500_000_000),
                token_outputs: tokens(BONK, "2000000000", None),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(trade.asset_amount, dec!(2));
        assert_eq!(trade.stable_amount, dec!(0.5));
        assert_eq!(trade.unit_price, dec!(0.25));
    }

    #[test]
    fn test_zero_amount_is_discarded() {
        let zero_output = event(SwapPayload {
            native_input: native(1_000_000_000),
            token_outputs: tokens(BONK, "not-a-number", Some(6)),
            ..Default::default()
        });
        assert!(classifier().classify(&zero_output).is_none());
    }

    #[test]
    fn test_token_entry_takes_precedence_over_native() {
        // Both a native input and a token input: the token leg is used
        let trade = classifier()
            .classify(&event(SwapPayload {
                native_input: native(3_000_000_000),
                token_inputs: tokens(USDC_MINT, "10000000", Some(6)),
                token_outputs: tokens(BONK, "100000", Some(5)),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(trade.stable_mint, USDC_MINT);
        assert_eq!(trade.stable_amount, dec!(10));
        assert_eq!(trade.asset_amount, dec!(1));
    }

    #[test]
    fn test_token_entry_without_mint_is_discarded() {
        let mut inputs = tokens(BONK, "100000", Some(5)).unwrap();
        inputs[0].mint = String::new();

        let record = event(SwapPayload {
            token_inputs: Some(inputs),
            native_output: native(2_000_000_000),
            ..Default::default()
        });
        assert!(classifier().classify(&record).is_none());
    }

    #[test]
    fn test_only_first_token_entry_is_consulted() {
        let mut outputs = tokens(BONK, "100000", Some(5)).unwrap();
        outputs.extend(tokens(WIF, "999", Some(0)).unwrap());

        let trade = classifier()
            .classify(&event(SwapPayload {
                native_input: native(1_000_000_000),
                token_outputs: Some(outputs),
                ..Default::default()
            }))
            .unwrap();

        assert_eq!(trade.asset_mint, BONK);
        assert_eq!(trade.asset_amount, dec!(1));
    }

    #[test]
    fn test_classify_all_filters_non_trades() {
        let events = vec![
            event(SwapPayload {
                native_input: native(1_000_000_000),
                token_outputs: tokens(BONK, "100000", Some(5)),
                ..Default::default()
            }),
            RawSwapEvent::default(),
            event(SwapPayload {
                token_inputs: tokens(BONK, "100000", Some(5)),
                native_output: native(2_000_000_000),
                ..Default::default()
            }),
        ];

        let trades = classifier().classify_all(&events);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].direction, TradeDirection::Buy);
        assert_eq!(trades[1].direction, TradeDirection::Sell);
        assert_eq!(trades[1].unit_price, dec!(2));
    }
}
