//! Venue identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exchange identifier.
///
/// The discriminant doubles as the wire byte in the outbound datagram
/// header, so values are stable and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Venue {
    Okx = 0,
    Bybit = 1,
}

impl Venue {
    /// All venues the gateway connects to.
    pub const ALL: [Venue; 2] = [Venue::Okx, Venue::Bybit];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Venue::Okx),
            1 => Some(Venue::Bybit),
            _ => None,
        }
    }

    /// Lowercase name used in logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            Venue::Okx => "okx",
            Venue::Bybit => "bybit",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
