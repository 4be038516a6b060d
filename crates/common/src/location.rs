use crate::error::NameplateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location of a registered channel input end
///
/// `address` is an opaque transport address ("host:port" for TCP, an
/// arbitrary token for in-process transports); `index` selects one of
/// possibly many channel ends behind that address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLocation {
    pub address: String,
    pub index: u32,
}

impl ChannelLocation {
    pub fn new(address: impl Into<String>, index: u32) -> Self {
        Self {
            address: address.into(),
            index,
        }
    }
}

/// Location of a registered barrier end
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarrierLocation {
    pub address: String,
    pub index: u32,
}

impl BarrierLocation {
    pub fn new(address: impl Into<String>, index: u32) -> Self {
        Self {
            address: address.into(),
            index,
        }
    }
}

/// A resolvable endpoint descriptor
///
/// Every location round-trips through its text form; the wire codec
/// transmits locations as length-prefixed strings. The absent location
/// is spelled `"null"` in text and is an explicit value here, never a
/// location that happens to be named "null".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    None,
    Channel(ChannelLocation),
    Barrier(BarrierLocation),
}

impl Location {
    pub fn is_none(&self) -> bool {
        matches!(self, Location::None)
    }

    /// Transport address of the location, if it has one
    pub fn address(&self) -> Option<&str> {
        match self {
            Location::None => None,
            Location::Channel(loc) => Some(&loc.address),
            Location::Barrier(loc) => Some(&loc.address),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::None => write!(f, "null"),
            Location::Channel(loc) => write!(f, "nc://{}/{}", loc.address, loc.index),
            Location::Barrier(loc) => write!(f, "nb://{}/{}", loc.address, loc.index),
        }
    }
}

impl FromStr for Location {
    type Err = NameplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "null" {
            return Ok(Location::None);
        }

        let (kind, rest) = if let Some(rest) = s.strip_prefix("nc://") {
            ("nc", rest)
        } else if let Some(rest) = s.strip_prefix("nb://") {
            ("nb", rest)
        } else {
            return Err(NameplateError::InvalidLocation(s.to_string()));
        };

        // The index is everything after the last '/'; the address may
        // itself contain slashes for exotic transports.
        let (address, index) = rest
            .rsplit_once('/')
            .ok_or_else(|| NameplateError::InvalidLocation(s.to_string()))?;

        if address.is_empty() {
            return Err(NameplateError::InvalidLocation(s.to_string()));
        }

        let index: u32 = index
            .parse()
            .map_err(|_| NameplateError::InvalidLocation(s.to_string()))?;

        match kind {
            "nc" => Ok(Location::Channel(ChannelLocation::new(address, index))),
            _ => Ok(Location::Barrier(BarrierLocation::new(address, index))),
        }
    }
}
