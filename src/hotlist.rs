//! Hotlist: watched BSSIDs and the ones currently seen.
//!
//! A BSSID enters the found list on a hotlist-hit indication and leaves it
//! on an explicit loss notification, or when the list is full and a newer
//! BSSID pushes it out. Aging is someone else's job.

use crate::bssid::Bssid;
use crate::config::ApThreshold;
use crate::defaults::MAX_HOTLIST_APS;
use crate::error::GscanError;
use crate::result::{ResultEntry, ResultSummary};

pub type HotlistWatch = heapless::Vec<ApThreshold, MAX_HOTLIST_APS>;

#[derive(Default)]
pub struct HotlistTracker {
    watch: HotlistWatch,
    /// Oldest first; reporting walks it in reverse.
    found: Vec<ResultEntry>,
}

impl HotlistTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the watch list, keeping at most [`MAX_HOTLIST_APS`] entries.
    /// Returns the number stored.
    pub fn set_watch_list(&mut self, aps: &[ApThreshold]) -> usize {
        self.watch.clear();
        for ap in aps {
            if self.watch.push(*ap).is_err() {
                log::warn!(
                    "Hotlist capped at {} APs, dropping {} entries",
                    MAX_HOTLIST_APS,
                    aps.len() - MAX_HOTLIST_APS
                );
                break;
            }
        }
        self.watch.len()
    }

    pub fn watch_list(&self) -> &[ApThreshold] {
        &self.watch
    }

    /// Record a sighting. A previous entry for the same BSSID is replaced;
    /// a new BSSID arriving at [`MAX_HOTLIST_APS`] evicts the oldest one.
    pub fn on_found(&mut self, entry: ResultEntry) -> Result<(), GscanError> {
        self.found.try_reserve(1)?;
        if let Some(pos) = self.found.iter().position(|e| e.bssid == entry.bssid) {
            self.found.remove(pos);
        } else if self.found.len() >= MAX_HOTLIST_APS {
            let evicted = self.found.remove(0);
            log::warn!(
                "Hotlist found list full, evicting {} for {}",
                evicted.bssid,
                entry.bssid
            );
        }
        log::debug!("Hotlist AP found: {} ({} dBm)", entry.bssid, entry.rssi);
        self.found.push(entry);
        Ok(())
    }

    /// Remove `bssid` from the found list.
    pub fn on_lost(&mut self, bssid: &Bssid) -> Option<ResultEntry> {
        let pos = self.found.iter().position(|e| e.bssid == *bssid)?;
        Some(self.found.remove(pos))
    }

    pub fn contains(&self, bssid: &Bssid) -> bool {
        self.found.iter().any(|e| e.bssid == *bssid)
    }

    /// Summaries of every found AP, newest first.
    pub fn summaries(&self) -> Vec<ResultSummary> {
        self.found.iter().rev().map(ResultEntry::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Drop the found list.
    pub fn flush(&mut self) {
        self.found.clear();
    }

    /// Drop the found list and the watch list.
    pub fn reset(&mut self) {
        self.flush();
        self.watch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ScanIndication;

    fn found(last: u8, rssi: i16) -> ResultEntry {
        let mut ind = ScanIndication::new(Bssid([0x10, 0, 0, 0, 0, last]), rssi, 2412);
        ind.is_hotlist_hit = true;
        ind.ie_bytes = vec![0, 3, b'a', b'b', b'c'];
        ResultEntry::from_indication(ind, 0)
    }

    // ── found / lost ────────────────────────────────────────────────

    #[test]
    fn found_then_lost() {
        let mut hl = HotlistTracker::new();
        hl.on_found(found(1, -50)).unwrap();
        assert!(hl.contains(&found(1, 0).bssid));

        let lost = hl.on_lost(&found(1, 0).bssid).unwrap();
        assert_eq!(lost.rssi, -50);
        assert!(hl.is_empty());
        assert!(hl.on_lost(&found(1, 0).bssid).is_none());
    }

    #[test]
    fn duplicate_found_replaces() {
        let mut hl = HotlistTracker::new();
        hl.on_found(found(1, -50)).unwrap();
        hl.on_found(found(2, -60)).unwrap();
        hl.on_found(found(1, -40)).unwrap();
        assert_eq!(hl.len(), 2);

        let summaries = hl.summaries();
        assert_eq!(summaries[0].bssid, found(1, 0).bssid);
        assert_eq!(summaries[0].rssi, -40);
        assert_eq!(summaries[1].bssid, found(2, 0).bssid);
    }

    #[test]
    fn summaries_are_newest_first() {
        let mut hl = HotlistTracker::new();
        for i in 1..=3 {
            hl.on_found(found(i, -50)).unwrap();
        }
        let order: Vec<u8> = hl.summaries().iter().map(|s| s.bssid.0[5]).collect();
        assert_eq!(order, [3, 2, 1]);
    }

    #[test]
    fn found_list_evicts_oldest_when_full() {
        let mut hl = HotlistTracker::new();
        for i in 0..=MAX_HOTLIST_APS as u8 {
            hl.on_found(found(i, -50)).unwrap();
        }
        assert_eq!(hl.len(), MAX_HOTLIST_APS);
        assert!(!hl.contains(&found(0, 0).bssid));
        assert!(hl.contains(&found(1, 0).bssid));
        assert_eq!(hl.summaries()[0].bssid, found(MAX_HOTLIST_APS as u8, 0).bssid);

        // refreshing a known BSSID at the cap evicts nothing
        hl.on_found(found(1, -40)).unwrap();
        assert_eq!(hl.len(), MAX_HOTLIST_APS);
        assert!(hl.contains(&found(2, 0).bssid));
    }

    // ── watch list ──────────────────────────────────────────────────

    #[test]
    fn watch_list_is_capped() {
        let mut hl = HotlistTracker::new();
        let aps: Vec<ApThreshold> = (0..MAX_HOTLIST_APS + 5)
            .map(|i| ApThreshold::new(Bssid([0, 0, 0, 0, 1, i as u8]), -90, -30))
            .collect();
        assert_eq!(hl.set_watch_list(&aps), MAX_HOTLIST_APS);
        assert_eq!(hl.watch_list().len(), MAX_HOTLIST_APS);
    }

    #[test]
    fn reset_clears_everything_flush_keeps_watch() {
        let mut hl = HotlistTracker::new();
        hl.set_watch_list(&[ApThreshold::new(Bssid([1; 6]), -90, -30)]);
        hl.on_found(found(1, -50)).unwrap();

        hl.flush();
        assert!(hl.is_empty());
        assert_eq!(hl.watch_list().len(), 1);

        hl.on_found(found(1, -50)).unwrap();
        hl.reset();
        assert!(hl.is_empty());
        assert!(hl.watch_list().is_empty());
    }
}
