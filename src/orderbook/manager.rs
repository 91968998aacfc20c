//! Order book manager
//!
//! Registry of order books keyed by (venue, instrument). Books are created
//! lazily on first write; each book carries its own lock so readers of
//! distinct books never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Bbo, OrderBook};
use crate::adapter::ParsedBook;
use crate::venue::Venue;

#[derive(Debug, Default)]
pub struct BookManager {
    books: RwLock<HashMap<(Venue, String), Arc<OrderBook>>>,
}

impl BookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a parsed venue message to the right book, creating it on
    /// first sight of the instrument.
    pub fn apply(&self, venue: Venue, update: &ParsedBook) {
        let book = self.book_or_create(venue, &update.instrument);
        if update.is_snapshot {
            book.apply_snapshot(&update.bids, &update.asks);
        } else {
            book.apply_delta(&update.bids, &update.asks);
        }
    }

    fn book_or_create(&self, venue: Venue, instrument: &str) -> Arc<OrderBook> {
        if let Some(book) = self.books.read().get(&(venue, instrument.to_string())) {
            return book.clone();
        }
        self.books
            .write()
            .entry((venue, instrument.to_string()))
            .or_default()
            .clone()
    }

    /// Look up a book without creating it.
    pub fn book(&self, venue: Venue, instrument: &str) -> Option<Arc<OrderBook>> {
        self.books
            .read()
            .get(&(venue, instrument.to_string()))
            .cloned()
    }

    /// Best bid and offer for one instrument.
    pub fn bbo(&self, venue: Venue, instrument: &str) -> Option<Bbo> {
        self.book(venue, instrument)?.bbo()
    }

    /// Instruments currently tracked for a venue.
    pub fn instruments(&self, venue: Venue) -> Vec<String> {
        self.books
            .read()
            .keys()
            .filter(|(v, _)| *v == venue)
            .map(|(_, instrument)| instrument.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}
