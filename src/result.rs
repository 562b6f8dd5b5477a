//! Scan indications and the cached result records built from them.

use ieee80211::elements::{ReadElements, SSIDElement};
use serde::Serialize;

use crate::bssid::Bssid;
use crate::defaults::RESULT_HEADER_LEN;

/// Maximum SSID length in bytes
pub const MAX_SSID_LEN: usize = 32;

/// SSID string (32 bytes plus one byte of slack)
pub type SsidString = heapless::String<33>;

/// One access-point sighting delivered by the scan indication feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIndication {
    pub bssid: Bssid,
    /// dBm
    pub rssi: i16,
    /// MHz
    pub channel_freq: u32,
    pub beacon_period: u16,
    pub capability: u16,
    /// Information elements following the fixed beacon fields.
    pub ie_bytes: Vec<u8>,
    /// ANQP payload appended by the firmware for Passpoint matches.
    pub anqp_bytes: Vec<u8>,
    /// Boot-time timestamp in microseconds, assigned by the caller.
    pub timestamp_us: u64,
    /// The firmware matched this BSSID against the hotlist.
    pub is_hotlist_hit: bool,
    /// The firmware matched this network against the preferred network list.
    pub is_watchlist_hit: bool,
}

impl ScanIndication {
    pub fn new(bssid: Bssid, rssi: i16, channel_freq: u32) -> Self {
        Self {
            bssid,
            rssi,
            channel_freq,
            beacon_period: 100,
            capability: 0,
            ie_bytes: Vec::new(),
            anqp_bytes: Vec::new(),
            timestamp_us: 0,
            is_hotlist_hit: false,
            is_watchlist_hit: false,
        }
    }
}

/// A cached scan result. Owned by the cache once admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub bssid: Bssid,
    pub ssid: SsidString,
    pub rssi: i16,
    pub channel_freq: u32,
    pub beacon_period: u16,
    pub capability: u16,
    pub timestamp_us: u64,
    pub ie_bytes: Vec<u8>,
    pub anqp_bytes: Vec<u8>,
    /// Scan cycle of the owning bucket when this result was recorded.
    pub scan_cycle: u32,
    size: usize,
}

impl ResultEntry {
    /// Build a result from an indication, stamping it with `scan_cycle`.
    pub fn from_indication(ind: ScanIndication, scan_cycle: u32) -> Self {
        let ssid = extract_ssid(&ind.ie_bytes);
        let size = RESULT_HEADER_LEN + ind.ie_bytes.len();
        Self {
            bssid: ind.bssid,
            ssid,
            rssi: ind.rssi,
            channel_freq: ind.channel_freq,
            beacon_period: ind.beacon_period,
            capability: ind.capability,
            timestamp_us: ind.timestamp_us,
            ie_bytes: ind.ie_bytes,
            anqp_bytes: ind.anqp_bytes,
            scan_cycle,
            size,
        }
    }

    /// Serialized length charged against the cache budget.
    ///
    /// Fixed header plus the IE payload; the ANQP payload is not charged.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            bssid: self.bssid,
            ssid: self.ssid.clone(),
            rssi: self.rssi,
            channel_freq: self.channel_freq,
            beacon_period: self.beacon_period,
            capability: self.capability,
            timestamp_us: self.timestamp_us,
            ie_len: self.ie_bytes.len() as u32,
        }
    }
}

/// The fixed part of a result, as carried by hotlist and ePNO events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub bssid: Bssid,
    pub ssid: SsidString,
    pub rssi: i16,
    #[serde(rename = "freq")]
    pub channel_freq: u32,
    pub beacon_period: u16,
    pub capability: u16,
    #[serde(rename = "ts")]
    pub timestamp_us: u64,
    pub ie_len: u32,
}

impl ResultSummary {
    /// Lost-AP events never carry IEs.
    pub fn without_ies(mut self) -> Self {
        self.ie_len = 0;
        self
    }
}

/// Extract the SSID from a raw IE buffer.
///
/// Hidden networks, oversized or non-UTF-8 SSIDs and truncated buffers all
/// yield an empty string.
pub fn extract_ssid(ies: &[u8]) -> SsidString {
    let mut ssid = SsidString::new();
    let elements = ReadElements { bytes: ies };
    if let Some(element) = elements.get_first_element::<SSIDElement>() {
        let _ = ssid.push_str(element.take_ssid());
    }
    ssid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ie(id: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![id, data.len() as u8];
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn extract_ssid_first_element() {
        let ies = ie(0, b"HomeNet");
        assert_eq!(extract_ssid(&ies).as_str(), "HomeNet");
    }

    #[test]
    fn extract_ssid_after_other_elements() {
        let mut ies = ie(1, &[0x82, 0x84, 0x8B]);
        ies.extend(ie(3, &[6]));
        ies.extend(ie(0, b"Cafe"));
        assert_eq!(extract_ssid(&ies).as_str(), "Cafe");
    }

    #[test]
    fn extract_ssid_hidden_network() {
        assert_eq!(extract_ssid(&ie(0, b"")).as_str(), "");
    }

    #[test]
    fn extract_ssid_truncated_buffer() {
        let ies = [0u8, 10, b'a', b'b'];
        assert_eq!(extract_ssid(&ies).as_str(), "");
        assert_eq!(extract_ssid(&[]).as_str(), "");
        assert_eq!(extract_ssid(&[0]).as_str(), "");
    }

    #[test]
    fn extract_ssid_invalid_utf8_is_empty() {
        assert_eq!(extract_ssid(&ie(0, &[0xFF, 0xFE])).as_str(), "");
    }

    #[test]
    fn extract_ssid_oversized_is_empty() {
        assert_eq!(extract_ssid(&ie(0, &[b'x'; 33])).as_str(), "");
        let max = [b'y'; MAX_SSID_LEN];
        assert_eq!(extract_ssid(&ie(0, &max)).len(), MAX_SSID_LEN);
    }

    #[test]
    fn entry_size_is_header_plus_ies() {
        let mut ind = ScanIndication::new(Bssid([1; 6]), -50, 2412);
        ind.ie_bytes = ie(0, b"Net");
        ind.anqp_bytes = vec![0; 40];
        let entry = ResultEntry::from_indication(ind, 3);
        assert_eq!(entry.size(), RESULT_HEADER_LEN + 5);
        assert_eq!(entry.scan_cycle, 3);
        assert_eq!(entry.ssid.as_str(), "Net");
    }

    #[test]
    fn summary_without_ies() {
        let mut ind = ScanIndication::new(Bssid([2; 6]), -70, 5180);
        ind.ie_bytes = vec![0xDD, 2, 1, 2];
        let summary = ResultEntry::from_indication(ind, 0).summary();
        assert_eq!(summary.ie_len, 4);
        assert_eq!(summary.without_ies().ie_len, 0);
    }
}
