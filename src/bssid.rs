//! BSSID value type.

use core::fmt;
use core::str::FromStr;

use serde::{Serialize, Serializer};

use crate::defaults::HASH_KEY_MASK;
use crate::error::GscanError;

/// Maximum length of a formatted MAC address ("AA:BB:CC:DD:EE:FF")
pub type MacString = heapless::String<18>;

/// A 6-byte IEEE 802.11 BSSID. The unique key of every cached result.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct Bssid(pub [u8; 6]);

impl Bssid {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Build from a byte slice; the slice must be exactly 6 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GscanError> {
        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| GscanError::InvalidParams("BSSID must be 6 bytes"))?;
        Ok(Self(octets))
    }

    /// Hash slot of this BSSID: low five bits of the last octet.
    #[inline]
    pub fn hash_key(&self) -> usize {
        (self.0[5] & HASH_KEY_MASK) as usize
    }

    /// Format into a fixed-size "AA:BB:CC:DD:EE:FF" string.
    pub fn to_mac_string(&self) -> MacString {
        let mut buf = MacString::new();
        format_mac(&self.0, &mut buf);
        buf
    }
}

impl FromStr for Bssid {
    type Err = GscanError;

    /// Parse colon-separated hex, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or(GscanError::InvalidParams("BSSID needs six octets"))?;
            if part.len() != 2 {
                return Err(GscanError::InvalidParams("BSSID octet must be two hex digits"));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| GscanError::InvalidParams("BSSID octet is not hex"))?;
        }
        if parts.next().is_some() {
            return Err(GscanError::InvalidParams("BSSID has more than six octets"));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bssid({self})")
    }
}

impl Serialize for Bssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_mac_string())
    }
}

/// Format a 6-byte MAC address into "AA:BB:CC:DD:EE:FF" string
pub fn format_mac(mac: &[u8; 6], buf: &mut MacString) {
    use core::fmt::Write;
    let _ = write!(
        buf,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
}
