//! Significant RSSI change tracking.
//!
//! Each watched AP carries an RSSI band. Samples outside the band count as
//! breaches; after `min_breaching` consecutive breaches a [`ChangeRecord`] is
//! staged. Staged records are emitted when the tracking bucket completes a
//! scan cycle.

use serde::Serialize;

use crate::bssid::Bssid;
use crate::bucket::BucketHandle;
use crate::config::{ApThreshold, SignificantChangeParams};
use crate::defaults::{INVALID_RSSI, MAX_SIGNIFICANT_CHANGE_APS, RSSI_HISTORY_DEPTH};
use crate::engine::GroupId;
use crate::error::GscanError;

/// RSSI history of one AP, oldest sample first, padded with [`INVALID_RSSI`].
pub type RssiHistory = [i16; RSSI_HISTORY_DEPTH];

/// One AP whose signal left its band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub bssid: Bssid,
    #[serde(rename = "freq")]
    pub channel_freq: u32,
    /// Number of valid samples in `rssi_history`.
    pub num_rssi: u8,
    pub rssi_history: RssiHistory,
}

/// A change computed by the firmware, with however many samples it kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssiReport {
    pub bssid: Bssid,
    pub channel_freq: u32,
    pub samples: Vec<i16>,
}

impl From<&RssiReport> for ChangeRecord {
    fn from(report: &RssiReport) -> Self {
        ChangeRecord::from_samples(report.bssid, report.channel_freq, &report.samples)
    }
}

impl ChangeRecord {
    /// Build a record from a sample list. Extra samples beyond the history
    /// depth are dropped.
    pub fn from_samples(bssid: Bssid, channel_freq: u32, samples: &[i16]) -> Self {
        let mut rssi_history = [INVALID_RSSI; RSSI_HISTORY_DEPTH];
        let n = samples.len().min(RSSI_HISTORY_DEPTH);
        rssi_history[..n].copy_from_slice(&samples[..n]);
        Self {
            bssid,
            channel_freq,
            num_rssi: n as u8,
            rssi_history,
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedAp {
    threshold: ApThreshold,
    history: heapless::Deque<i16, RSSI_HISTORY_DEPTH>,
    breaches: u16,
}

impl TrackedAp {
    fn new(threshold: ApThreshold) -> Self {
        Self {
            threshold,
            history: heapless::Deque::new(),
            breaches: 0,
        }
    }

    fn record(&mut self, rssi: i16, window: usize) {
        while self.history.len() >= window {
            self.history.pop_front();
        }
        debug_assert!(window <= RSSI_HISTORY_DEPTH);
        let _ = self.history.push_back(rssi);
    }

    fn samples(&self) -> heapless::Vec<i16, RSSI_HISTORY_DEPTH> {
        self.history.iter().copied().collect()
    }
}

/// The bucket that drives significant-change evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingBucket {
    pub handle: BucketHandle,
    pub group: GroupId,
    /// Allocated for tracking alone, not borrowed from a client group.
    pub exclusive: bool,
}

pub struct SignificantChangeTracker {
    aps: heapless::Vec<TrackedAp, MAX_SIGNIFICANT_CHANGE_APS>,
    rssi_sample_size: usize,
    lost_ap_sample_size: u16,
    min_breaching: u16,
    staged: Vec<ChangeRecord>,
    tracking: Option<TrackingBucket>,
}

impl SignificantChangeTracker {
    pub fn new() -> Self {
        Self {
            aps: heapless::Vec::new(),
            rssi_sample_size: RSSI_HISTORY_DEPTH,
            lost_ap_sample_size: 0,
            min_breaching: 1,
            staged: Vec::new(),
            tracking: None,
        }
    }

    /// Replace the watch list with the APs in `params` and apply its
    /// sampling parameters. Staged records are dropped; the tracking bucket
    /// binding is kept. Returns how many APs are tracked afterwards.
    pub fn configure(&mut self, params: &SignificantChangeParams) -> usize {
        self.aps.clear();
        self.staged.clear();
        self.rssi_sample_size = (params.rssi_sample_size as usize).clamp(1, RSSI_HISTORY_DEPTH);
        self.lost_ap_sample_size = params.lost_ap_sample_size;
        self.min_breaching = params.min_breaching.max(1);

        for (i, ap) in params.aps.iter().enumerate() {
            if !self.register(*ap) {
                log::warn!(
                    "Significant change list capped at {} APs, dropping {} entries",
                    MAX_SIGNIFICANT_CHANGE_APS,
                    params.aps.len() - i
                );
                break;
            }
        }
        log::info!(
            "Significant change: {} APs, sample size {}, min breaching {}",
            self.aps.len(),
            self.rssi_sample_size,
            self.min_breaching
        );
        self.aps.len()
    }

    /// Watch `threshold.bssid`. A known BSSID gets its band updated.
    /// Returns false if the array is full and the BSSID is new.
    pub fn register(&mut self, threshold: ApThreshold) -> bool {
        if let Some(ap) = self.find_mut(&threshold.bssid) {
            ap.threshold = threshold;
            return true;
        }
        self.aps.push(TrackedAp::new(threshold)).is_ok()
    }

    /// Feed one RSSI sample. Returns true if a change record was staged.
    ///
    /// Fails only if staging storage cannot grow; tracker state is then
    /// unchanged apart from the recorded sample.
    pub fn evaluate(
        &mut self,
        bssid: &Bssid,
        channel_freq: u32,
        rssi: i16,
    ) -> Result<bool, GscanError> {
        let window = self.rssi_sample_size;
        let min_breaching = self.min_breaching;
        let Some(ap) = self.aps.iter_mut().find(|ap| ap.threshold.bssid == *bssid) else {
            return Ok(false);
        };

        ap.record(rssi, window);
        if ap.threshold.contains(rssi) {
            ap.breaches = 0;
            return Ok(false);
        }
        ap.breaches = ap.breaches.saturating_add(1);
        if ap.breaches < min_breaching {
            return Ok(false);
        }

        let record = ChangeRecord::from_samples(*bssid, channel_freq, &ap.samples());
        match self.staged.iter_mut().find(|r| r.bssid == *bssid) {
            Some(existing) => *existing = record,
            None => {
                self.staged.try_reserve(1)?;
                self.staged.push(record);
            }
        }
        if let Some(ap) = self.find_mut(bssid) {
            ap.breaches = 0;
        }
        log::debug!(
            "Significant change staged for {} at {} dBm",
            bssid,
            rssi
        );
        Ok(true)
    }

    /// Move out every staged record.
    pub fn take_staged(&mut self) -> Vec<ChangeRecord> {
        core::mem::take(&mut self.staged)
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn len(&self) -> usize {
        self.aps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aps.is_empty()
    }

    pub fn lost_ap_sample_size(&self) -> u16 {
        self.lost_ap_sample_size
    }

    pub fn tracking(&self) -> Option<TrackingBucket> {
        self.tracking
    }

    pub fn set_tracking(&mut self, tracking: TrackingBucket) {
        self.tracking = Some(tracking);
    }

    /// Forget the tracking bucket without touching the watch list.
    pub fn clear_tracking(&mut self) -> Option<TrackingBucket> {
        self.tracking.take()
    }

    /// Drop every watched AP and staged record. Returns the tracking bucket
    /// binding so the caller can release it if exclusive.
    pub fn reset(&mut self) -> Option<TrackingBucket> {
        self.aps.clear();
        self.staged.clear();
        self.rssi_sample_size = RSSI_HISTORY_DEPTH;
        self.lost_ap_sample_size = 0;
        self.min_breaching = 1;
        self.tracking.take()
    }

    fn find_mut(&mut self, bssid: &Bssid) -> Option<&mut TrackedAp> {
        self.aps.iter_mut().find(|ap| ap.threshold.bssid == *bssid)
    }
}

impl Default for SignificantChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}
