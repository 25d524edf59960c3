use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::{TokenPosition, Trade};

/// Groups trades by asset mint, keeping first-seen order of the mints.
///
/// Duplicate signatures are counted again; a warning is logged so a double count
/// caused by overlapping upstream pages is visible.
#[derive(Debug, Default)]
pub struct TradeAggregator {
    positions: Vec<TokenPosition>,
    index: HashMap<String, usize>,
    seen_signatures: HashSet<String>,
}

impl TradeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate a batch of trades in one call
    pub fn from_trades(trades: impl IntoIterator<Item = Trade>) -> Self {
        let mut aggregator = Self::new();
        for trade in trades {
            aggregator.add(trade);
        }
        aggregator
    }

    pub fn add(&mut self, trade: Trade) {
        if !self.seen_signatures.insert(trade.signature.clone()) {
            warn!(
                "Signature {} seen more than once; counting it again",
                trade.signature
            );
        }

        let position = self.entry(&trade.asset_mint);
        position.record(trade);
    }

    /// Get the position for a mint, creating an empty one on first sight
    fn entry(&mut self, mint: &str) -> &mut TokenPosition {
        let slot = match self.index.get(mint).copied() {
            Some(slot) => slot,
            None => {
                self.positions.push(TokenPosition::new(mint));
                let slot = self.positions.len() - 1;
                self.index.insert(mint.to_string(), slot);
                slot
            }
        };
        &mut self.positions[slot]
    }

    pub fn get(&self, mint: &str) -> Option<&TokenPosition> {
        self.index.get(mint).map(|slot| &self.positions[*slot])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions in first-seen order
    pub fn into_positions(self) -> Vec<TokenPosition> {
        debug!("Grouped trades into {} token positions", self.positions.len());
        self.positions
    }
}
