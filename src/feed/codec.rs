//! Binary wire format for the feed datagrams
//!
//! Layout: a packed 24-byte header, the ASCII symbol, then bid levels
//! followed by ask levels. All multi-byte integers are network byte
//! order; quantities travel as the f64 bit pattern byte-swapped as a u64.

use crate::adapter::{ParsedBook, PriceLevel};
use crate::venue::Venue;

/// "HFTD"
pub const FEED_MAGIC: u32 = 0x4846_5444;
pub const FEED_VERSION: u16 = 1;

pub const MSG_TYPE_SNAPSHOT: u8 = 1;
pub const MSG_TYPE_DELTA: u8 = 2;

pub const HEADER_LEN: usize = 24;
pub const LEVEL_LEN: usize = 16;

/// Serialize one book update into `buf` (cleared first).
pub fn encode(book: &ParsedBook, venue: Venue, timestamp_ns: u64, buf: &mut Vec<u8>) {
    buf.clear();
    buf.reserve(HEADER_LEN + book.instrument.len() + (book.bids.len() + book.asks.len()) * LEVEL_LEN);

    buf.extend_from_slice(&FEED_MAGIC.to_be_bytes());
    buf.extend_from_slice(&FEED_VERSION.to_be_bytes());
    buf.push(if book.is_snapshot {
        MSG_TYPE_SNAPSHOT
    } else {
        MSG_TYPE_DELTA
    });
    buf.push(venue.as_u8());
    buf.extend_from_slice(&timestamp_ns.to_be_bytes());
    buf.extend_from_slice(&(book.instrument.len() as u32).to_be_bytes());
    buf.extend_from_slice(&(book.bids.len() as u16).to_be_bytes());
    buf.extend_from_slice(&(book.asks.len() as u16).to_be_bytes());

    buf.extend_from_slice(book.instrument.as_bytes());

    for level in book.bids.iter().chain(book.asks.iter()) {
        buf.extend_from_slice(&level.price.to_be_bytes());
        buf.extend_from_slice(&level.quantity.to_bits().to_be_bytes());
    }
}

/// A decoded feed datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub msg_type: u8,
    pub venue: Venue,
    pub timestamp_ns: u64,
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl Datagram {
    pub fn is_snapshot(&self) -> bool {
        self.msg_type == MSG_TYPE_SNAPSHOT
    }
}

/// Parse one datagram. Returns `None` on bad magic, version, or length.
pub fn decode(data: &[u8]) -> Option<Datagram> {
    let mut cursor = Cursor { data, pos: 0 };

    if cursor.u32()? != FEED_MAGIC || cursor.u16()? != FEED_VERSION {
        return None;
    }
    let msg_type = cursor.u8()?;
    let venue = Venue::from_u8(cursor.u8()?)?;
    let timestamp_ns = cursor.u64()?;
    let symbol_len = cursor.u32()? as usize;
    let bid_count = cursor.u16()? as usize;
    let ask_count = cursor.u16()? as usize;

    let symbol = String::from_utf8(cursor.bytes(symbol_len)?.to_vec()).ok()?;

    let mut levels = Vec::with_capacity(bid_count + ask_count);
    for _ in 0..bid_count + ask_count {
        let price = cursor.u64()?;
        let quantity = f64::from_bits(cursor.u64()?);
        levels.push(PriceLevel { price, quantity });
    }
    let asks = levels.split_off(bid_count);

    Some(Datagram {
        msg_type,
        venue,
        timestamp_ns,
        symbol,
        bids: levels,
        asks,
    })
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.bytes(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.bytes(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.bytes(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        self.bytes(8).map(|b| {
            u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }
}
