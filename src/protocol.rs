/// JSON message protocol for events leaving the scan cache.
///
/// All messages are newline-delimited JSON (NDJSON), one event per line,
/// tagged by `"type"`. Messages borrow from the [`GscanEvent`] they render.
use serde::Serialize;

use crate::batch::BatchReason;
use crate::port::GscanEvent;
use crate::result::ResultSummary;
use crate::significant::ChangeRecord;
use crate::staging::RoamCandidate;

/// Messages written to an NDJSON event stream
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum SinkMessage<'a> {
    /// Every hotlist AP currently seen, newest first
    #[serde(rename = "hotlist_found")]
    HotlistFound { aps: &'a [ResultSummary] },
    /// Hotlist APs reported gone
    #[serde(rename = "hotlist_lost")]
    HotlistLost { aps: &'a [ResultSummary] },
    #[serde(rename = "significant_change")]
    SignificantChange { changes: &'a [ChangeRecord] },
    /// Batch threshold reached at the end of a scan cycle
    #[serde(rename = "batch")]
    Batch { reason: BatchReason },
    /// One result forwarded as it arrived
    #[serde(rename = "full_result")]
    FullResult {
        /// Bit `i` set for bucket `i`
        buckets: u32,
        ap: ResultSummary,
        anqp_len: u32,
    },
    #[serde(rename = "epno_match")]
    EpnoMatch { ap: &'a ResultSummary },
    #[serde(rename = "hotspot_match")]
    HotspotMatch { ap: ResultSummary, anqp_len: u32 },
    #[serde(rename = "roam_candidates")]
    RoamCandidates { candidates: &'a [RoamCandidate] },
}

impl<'a> From<&'a GscanEvent> for SinkMessage<'a> {
    fn from(event: &'a GscanEvent) -> Self {
        match event {
            GscanEvent::HotlistFound(aps) => SinkMessage::HotlistFound { aps },
            GscanEvent::HotlistLost(aps) => SinkMessage::HotlistLost { aps },
            GscanEvent::SignificantChange(changes) => SinkMessage::SignificantChange { changes },
            GscanEvent::BatchThresholdReached(reason) => SinkMessage::Batch { reason: *reason },
            GscanEvent::FullScanResult {
                bucket_mask,
                result,
            } => SinkMessage::FullResult {
                buckets: *bucket_mask,
                ap: result.summary(),
                anqp_len: result.anqp_bytes.len() as u32,
            },
            GscanEvent::EpnoMatch(ap) => SinkMessage::EpnoMatch { ap },
            GscanEvent::HotspotMatch(result) => SinkMessage::HotspotMatch {
                ap: result.summary(),
                anqp_len: result.anqp_bytes.len() as u32,
            },
            GscanEvent::RoamCandidates(candidates) => SinkMessage::RoamCandidates { candidates },
        }
    }
}

/// Maximum size of a serialized JSON message.
///
/// Large enough for a full 64-entry hotlist found event.
pub const MAX_MSG_LEN: usize = 16 * 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bssid::Bssid;
    use crate::defaults::INVALID_RSSI;
    use crate::result::{ResultEntry, ScanIndication};

    fn render(event: &GscanEvent) -> std::string::String {
        let mut buf = [0u8; 2048];
        let len = serde_json_core::to_slice(&SinkMessage::from(event), &mut buf).unwrap();
        core::str::from_utf8(&buf[..len]).unwrap().to_owned()
    }

    fn entry() -> ResultEntry {
        let mut ind = ScanIndication::new("B4:1E:52:AB:CD:EF".parse().unwrap(), -45, 2437);
        ind.ie_bytes = vec![0, 4, b'C', b'a', b'f', b'e'];
        ind.timestamp_us = 1000;
        ResultEntry::from_indication(ind, 0)
    }

    // ── Event serialization ─────────────────────────────────────────

    #[test]
    fn serialize_hotlist_found() {
        let json = render(&GscanEvent::HotlistFound(vec![entry().summary()]));
        assert!(json.starts_with(r#"{"type":"hotlist_found""#));
        assert!(json.contains(r#""bssid":"B4:1E:52:AB:CD:EF""#));
        assert!(json.contains(r#""ssid":"Cafe""#));
        assert!(json.contains(r#""rssi":-45"#));
        assert!(json.contains(r#""freq":2437"#));
        assert!(json.contains(r#""ts":1000"#));
        assert!(json.contains(r#""ie_len":6"#));
    }

    #[test]
    fn serialize_empty_hotlist_lost() {
        let json = render(&GscanEvent::HotlistLost(Vec::new()));
        assert_eq!(json, r#"{"type":"hotlist_lost","aps":[]}"#);
    }

    #[test]
    fn serialize_batch_reason() {
        let json = render(&GscanEvent::BatchThresholdReached(
            BatchReason::ThresholdPercent,
        ));
        assert_eq!(json, r#"{"type":"batch","reason":"threshold_percent"}"#);
    }

    #[test]
    fn serialize_significant_change_history() {
        let record = ChangeRecord::from_samples(Bssid([0, 0x11, 0x22, 0x33, 0x44, 0x55]), 5180, &[-60, -80]);
        let json = render(&GscanEvent::SignificantChange(vec![record]));
        assert!(json.contains(r#""type":"significant_change""#));
        assert!(json.contains(r#""bssid":"00:11:22:33:44:55""#));
        assert!(json.contains(r#""num_rssi":2"#));
        let padded = format!("[-60,-80,{0},{0},{0},{0},{0},{0}]", INVALID_RSSI);
        assert!(json.contains(&padded), "{json}");
    }

    #[test]
    fn serialize_full_result_mask() {
        let json = render(&GscanEvent::FullScanResult {
            bucket_mask: 0b100,
            result: entry(),
        });
        assert!(json.contains(r#""type":"full_result""#));
        assert!(json.contains(r#""buckets":4"#));
        assert!(json.contains(r#""anqp_len":0"#));
    }

    #[test]
    fn serialize_hotspot_match_counts_anqp() {
        let mut result = entry();
        result.anqp_bytes = vec![0; 12];
        let json = render(&GscanEvent::HotspotMatch(result));
        assert!(json.contains(r#""type":"hotspot_match""#));
        assert!(json.contains(r#""anqp_len":12"#));
    }

    #[test]
    fn serialize_roam_candidates() {
        let json = render(&GscanEvent::RoamCandidates(vec![RoamCandidate {
            bssid: Bssid([2; 6]),
            channel_freq: 5745,
            rssi: -58,
            score: 412,
            channel_load: 35,
        }]));
        assert!(json.contains(r#""type":"roam_candidates""#));
        assert!(json.contains(r#""freq":5745"#));
        assert!(json.contains(r#""score":412"#));
    }
}
