//! Roam candidate staging.
//!
//! Candidates computed during a roam-triggered scan are held here and
//! emitted once, together, when that scan completes.

use serde::Serialize;

use crate::bssid::Bssid;

/// One candidate AP observed during a roam scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoamCandidate {
    pub bssid: Bssid,
    #[serde(rename = "freq")]
    pub channel_freq: u32,
    pub rssi: i16,
    /// Candidate score as computed by the roaming logic; higher is better.
    pub score: u32,
    /// Channel utilization, percent.
    pub channel_load: u8,
}

#[derive(Debug, Default)]
pub struct RoamCandidateStaging {
    active: bool,
    candidates: Vec<RoamCandidate>,
}

impl RoamCandidateStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting. Anything left from an unfinished scan is dropped.
    pub fn begin(&mut self) {
        if !self.candidates.is_empty() {
            log::warn!(
                "Roam scan restarted, dropping {} staged candidates",
                self.candidates.len()
            );
        }
        self.candidates.clear();
        self.active = true;
    }

    /// Stage a candidate. Ignored outside a roam scan.
    pub fn stage(&mut self, candidate: RoamCandidate) {
        if !self.active {
            log::debug!("No roam scan in progress, ignoring {}", candidate.bssid);
            return;
        }
        self.candidates.push(candidate);
    }

    /// End the roam scan and hand back what was staged, in arrival order.
    /// Returns `None` if no roam scan was in progress.
    pub fn finish(&mut self) -> Option<Vec<RoamCandidate>> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(core::mem::take(&mut self.candidates))
    }

    pub fn discard(&mut self) {
        self.active = false;
        self.candidates.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(last: u8) -> RoamCandidate {
        RoamCandidate {
            bssid: Bssid([0x30, 0, 0, 0, 0, last]),
            channel_freq: 5180,
            rssi: -60,
            score: 100,
            channel_load: 10,
        }
    }

    #[test]
    fn finish_emits_once_in_order() {
        let mut st = RoamCandidateStaging::new();
        st.begin();
        st.stage(candidate(1));
        st.stage(candidate(2));

        let out = st.finish().unwrap();
        assert_eq!(out, [candidate(1), candidate(2)]);
        assert!(st.finish().is_none());
        assert!(st.is_empty());
    }

    #[test]
    fn stage_outside_scan_is_ignored() {
        let mut st = RoamCandidateStaging::new();
        st.stage(candidate(1));
        assert!(st.is_empty());
        assert!(st.finish().is_none());
    }

    #[test]
    fn discard_drops_everything() {
        let mut st = RoamCandidateStaging::new();
        st.begin();
        st.stage(candidate(1));
        st.discard();
        assert!(!st.is_active());
        assert!(st.finish().is_none());
    }

    #[test]
    fn begin_again_resets() {
        let mut st = RoamCandidateStaging::new();
        st.begin();
        st.stage(candidate(1));
        st.begin();
        assert_eq!(st.finish().unwrap().len(), 0);
    }
}
