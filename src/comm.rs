/// Output transport: renders engine events as NDJSON onto any writer.
///
/// Each event becomes one line. A serialization failure or write error
/// drops that event and is logged; the engine never sees it.
use std::io::Write;

use crate::port::{EventSink, GscanEvent};
use crate::protocol::{SinkMessage, MAX_MSG_LEN};

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a SinkMessage to JSON bytes followed by a newline.
/// Returns the number of bytes written, or None if it did not fit.
pub fn serialize_message(msg: &SinkMessage, buf: &mut [u8]) -> Option<usize> {
    let len = serde_json_core::to_slice(msg, buf).ok()?;
    // Append newline for NDJSON
    let newline = buf.get_mut(len)?;
    *newline = b'\n';
    Some(len + 1)
}

/// Serialize one event as an NDJSON line.
pub fn serialize_event(event: &GscanEvent, buf: &mut [u8]) -> Option<usize> {
    serialize_message(&SinkMessage::from(event), buf)
}

// ── NDJSON sink ────────────────────────────────────────────────────────

/// An [`EventSink`] writing one JSON line per event.
pub struct NdjsonSink<W> {
    writer: W,
    buf: Vec<u8>,
    dropped: u32,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_max_line(writer, MAX_MSG_LEN)
    }

    /// Use a line buffer of `max_line` bytes instead of [`MAX_MSG_LEN`].
    pub fn with_max_line(writer: W, max_line: usize) -> Self {
        Self {
            writer,
            buf: vec![0; max_line],
            dropped: 0,
        }
    }

    /// Events that could not be rendered or written.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for NdjsonSink<W> {
    fn emit(&mut self, event: GscanEvent) {
        let Some(len) = serialize_event(&event, &mut self.buf) else {
            log::warn!(
                "{} event exceeds {} bytes, dropped",
                event.name(),
                self.buf.len()
            );
            self.dropped = self.dropped.saturating_add(1);
            return;
        };
        if let Err(err) = self.writer.write_all(&self.buf[..len]) {
            log::error!("Failed to write {} event: {}", event.name(), err);
            self.dropped = self.dropped.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchReason;
    use crate::bssid::Bssid;
    use crate::defaults::MAX_HOTLIST_APS;
    use crate::result::{ResultEntry, ScanIndication};

    fn summary(last: u8) -> crate::result::ResultSummary {
        let ind = ScanIndication::new(Bssid([0xAB, 0, 0, 0, 0, last]), -50, 2412);
        ResultEntry::from_indication(ind, 0).summary()
    }

    // ── serialize_event ─────────────────────────────────────────────

    #[test]
    fn serialize_appends_newline() {
        let mut buf = [0u8; 256];
        let event = GscanEvent::BatchThresholdReached(BatchReason::ResultsAvailable);
        let len = serialize_event(&event, &mut buf).unwrap();
        assert_eq!(buf[len - 1], b'\n');
        assert_eq!(
            core::str::from_utf8(&buf[..len]).unwrap(),
            "{\"type\":\"batch\",\"reason\":\"results_available\"}\n"
        );
    }

    #[test]
    fn serialize_without_room_for_newline_fails() {
        let event = GscanEvent::BatchThresholdReached(BatchReason::ResultsAvailable);
        let json_len = r#"{"type":"batch","reason":"results_available"}"#.len();
        let mut exact = vec![0u8; json_len];
        assert_eq!(serialize_event(&event, &mut exact), None);
        let mut small = [0u8; 8];
        assert_eq!(serialize_event(&event, &mut small), None);
    }

    // ── NdjsonSink ──────────────────────────────────────────────────

    #[test]
    fn sink_writes_one_line_per_event() {
        let mut sink = NdjsonSink::new(Vec::new());
        sink.emit(GscanEvent::HotlistFound(vec![summary(1), summary(2)]));
        sink.emit(GscanEvent::HotlistLost(Vec::new()));

        let out = core::str::from_utf8(sink.get_ref()).unwrap().to_owned();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"type":"hotlist_found","aps":[{"bssid":"AB:00:00:00:00:01""#));
        assert_eq!(lines[1], r#"{"type":"hotlist_lost","aps":[]}"#);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn sink_drops_oversized_event() {
        let mut sink = NdjsonSink::with_max_line(Vec::new(), 64);
        let many: Vec<_> = (0..10).map(summary).collect();
        sink.emit(GscanEvent::HotlistFound(many));
        assert!(sink.get_ref().is_empty());
        assert_eq!(sink.dropped(), 1);

        sink.emit(GscanEvent::BatchThresholdReached(BatchReason::ThresholdNumScans));
        assert!(!sink.into_inner().is_empty());
    }

    #[test]
    fn full_hotlist_fits_default_line() {
        let aps: Vec<_> = (0..MAX_HOTLIST_APS as u8)
            .map(|i| {
                let mut ind = ScanIndication::new(Bssid([0xAB, 0xCD, 0xEF, 0, 0, i]), -100, 5825);
                ind.ie_bytes = vec![0, 32];
                ind.ie_bytes.extend_from_slice(&[b'w'; 32]);
                ind.beacon_period = u16::MAX;
                ind.capability = u16::MAX;
                ind.timestamp_us = u64::MAX;
                ResultEntry::from_indication(ind, 0).summary()
            })
            .collect();
        let mut sink = NdjsonSink::new(Vec::new());
        sink.emit(GscanEvent::HotlistFound(aps));
        assert_eq!(sink.dropped(), 0);
        assert_eq!(sink.get_ref().iter().filter(|b| **b == b'\n').count(), 1);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_counts_write_errors() {
        let mut sink = NdjsonSink::new(BrokenPipe);
        sink.emit(GscanEvent::HotlistLost(Vec::new()));
        assert_eq!(sink.dropped(), 1);
    }
}
