//! Core order book implementation
//!
//! Uses BTreeMap for sorted price level management, guarded by a
//! reader-writer lock so BBO reads proceed concurrently.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{Bbo, Side};
use crate::adapter::PriceLevel;

/// Order book for a single (venue, instrument).
///
/// Prices are fixed-point (decimal × 10^8) so integer ordering is total.
/// After any completed apply no level holds a zero quantity.
#[derive(Debug, Default)]
pub struct OrderBook {
    inner: RwLock<Ladders>,
}

#[derive(Debug, Default)]
struct Ladders {
    /// Bids keyed descending (best first)
    bids: BTreeMap<Reverse<u64>, f64>,
    /// Asks keyed ascending (best first)
    asks: BTreeMap<u64, f64>,
}

impl Ladders {
    fn upsert(&mut self, level: &PriceLevel, side: Side) {
        match side {
            Side::Bid => {
                if level.quantity <= 0.0 {
                    self.bids.remove(&Reverse(level.price));
                } else {
                    self.bids.insert(Reverse(level.price), level.quantity);
                }
            }
            Side::Ask => {
                if level.quantity <= 0.0 {
                    self.asks.remove(&level.price);
                } else {
                    self.asks.insert(level.price, level.quantity);
                }
            }
        }
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book atomically. Zero-quantity entries are
    /// skipped rather than inserted.
    pub fn apply_snapshot(&self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        let mut inner = self.inner.write();
        inner.bids.clear();
        inner.asks.clear();
        for level in bids {
            inner.upsert(level, Side::Bid);
        }
        for level in asks {
            inner.upsert(level, Side::Ask);
        }
    }

    /// Apply an incremental update: zero quantity deletes the level,
    /// anything else upserts it. Duplicate prices within one batch: last
    /// wins. A delete for an absent level is a no-op.
    pub fn apply_delta(&self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        let mut inner = self.inner.write();
        for level in bids {
            inner.upsert(level, Side::Bid);
        }
        for level in asks {
            inner.upsert(level, Side::Ask);
        }
    }

    /// Top of both sides; `None` if either side is empty.
    pub fn bbo(&self) -> Option<Bbo> {
        let inner = self.inner.read();
        let (Reverse(bid_price), bid_qty) = inner.bids.first_key_value()?;
        let (ask_price, ask_qty) = inner.asks.first_key_value()?;
        Some(Bbo {
            bid_price: *bid_price,
            bid_qty: *bid_qty,
            ask_price: *ask_price,
            ask_qty: *ask_qty,
        })
    }

    /// Remove every level from both sides.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.bids.clear();
        inner.asks.clear();
    }

    /// Number of resting levels per side (bids, asks).
    pub fn depth(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.bids.len(), inner.asks.len())
    }

    /// Bid ladder, best first.
    pub fn bid_levels(&self) -> Vec<PriceLevel> {
        self.inner
            .read()
            .bids
            .iter()
            .map(|(Reverse(price), qty)| PriceLevel {
                price: *price,
                quantity: *qty,
            })
            .collect()
    }

    /// Ask ladder, best first.
    pub fn ask_levels(&self) -> Vec<PriceLevel> {
        self.inner
            .read()
            .asks
            .iter()
            .map(|(price, qty)| PriceLevel {
                price: *price,
                quantity: *qty,
            })
            .collect()
    }
}
