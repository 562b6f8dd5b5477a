//! Runtime configuration and scan request parameters.
//!
//! `CacheConfig` sizes the engine at interface bring-up. The remaining types
//! describe what a client asks for when adding a scan group or a watch list;
//! they are verified here before any bucket or memory is touched.

use crate::bssid::Bssid;
use crate::defaults::{
    MAX_AP_CACHE_PER_SCAN, MAX_BUCKETS, MAX_CHANNELS_PER_BUCKET, MAX_RSSI_SAMPLE_SIZE,
    MAX_SCAN_CACHE_SIZE, MAX_SCAN_REPORTING_THRESHOLD, MAX_SIGNIFICANT_CHANGE_APS,
};
use crate::error::GscanError;

/// Engine sizing, fixed for the lifetime of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Byte budget shared by every cached result.
    pub capacity_bytes: usize,
}

impl CacheConfig {
    pub const fn new() -> Self {
        Self {
            capacity_bytes: MAX_SCAN_CACHE_SIZE,
        }
    }

    pub const fn with_capacity(capacity_bytes: usize) -> Self {
        Self { capacity_bytes }
    }

    /// Byte threshold corresponding to `percent` of the capacity.
    pub fn threshold_bytes(&self, percent: u32) -> usize {
        self.capacity_bytes * percent as usize / 100
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Band / scan policy ───────────────────────────────────────────────

/// Band selector for a bucket that does not list explicit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Band {
    #[default]
    Unspecified,
    /// 2.4 GHz
    Bg,
    /// 5 GHz without DFS channels
    A,
    /// 5 GHz DFS channels only
    ADfs,
    /// 5 GHz including DFS
    AWithDfs,
    /// 2.4 GHz and 5 GHz without DFS
    Abg,
    /// 2.4 GHz and 5 GHz including DFS
    AbgWithDfs,
}

/// Firmware scan policy bits derived from a [`Band`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy(pub u8);

impl ScanPolicy {
    pub const ANY_RA: ScanPolicy = ScanPolicy(0x00);
    pub const BAND_2_4GHZ: ScanPolicy = ScanPolicy(0x01);
    pub const BAND_5GHZ: ScanPolicy = ScanPolicy(0x02);
    pub const NON_DFS: ScanPolicy = ScanPolicy(0x04);
    pub const DFS: ScanPolicy = ScanPolicy(0x08);

    pub const fn union(self, other: ScanPolicy) -> ScanPolicy {
        ScanPolicy(self.0 | other.0)
    }

    pub const fn contains(self, other: ScanPolicy) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Band {
    pub fn scan_policy(self) -> ScanPolicy {
        use ScanPolicy as P;
        match self {
            Band::Unspecified => P::ANY_RA,
            Band::Bg => P::BAND_2_4GHZ,
            Band::A => P::BAND_5GHZ.union(P::NON_DFS),
            Band::ADfs => P::BAND_5GHZ.union(P::DFS),
            Band::AWithDfs => P::BAND_5GHZ.union(P::NON_DFS).union(P::DFS),
            Band::Abg => P::BAND_5GHZ.union(P::NON_DFS).union(P::BAND_2_4GHZ),
            Band::AbgWithDfs => P::BAND_5GHZ
                .union(P::NON_DFS)
                .union(P::DFS)
                .union(P::BAND_2_4GHZ),
        }
    }
}

// ── Report events ────────────────────────────────────────────────────

/// Per-bucket reporting policy, a bitmask.
///
/// The empty set means "report only when the buffer fills".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportEvents(u8);

impl ReportEvents {
    pub const NONE: ReportEvents = ReportEvents(0);
    /// Raise "results available" at the end of every scan cycle.
    pub const EACH_SCAN: ReportEvents = ReportEvents(1 << 0);
    /// Forward every result as it arrives.
    pub const FULL_RESULTS: ReportEvents = ReportEvents(1 << 1);
    /// Do not batch results in firmware.
    pub const NO_BATCH: ReportEvents = ReportEvents(1 << 2);

    const ALL_BITS: u8 = 0b111;

    /// Accepts only known bits.
    pub const fn from_bits(bits: u8) -> Option<ReportEvents> {
        if bits & !Self::ALL_BITS == 0 {
            Some(ReportEvents(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ReportEvents) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn union(self, other: ReportEvents) -> ReportEvents {
        ReportEvents(self.0 | other.0)
    }
}

impl core::ops::BitOr for ReportEvents {
    type Output = ReportEvents;

    fn bitor(self, rhs: ReportEvents) -> ReportEvents {
        self.union(rhs)
    }
}

/// Firmware report mode bits for one bucket's scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportMode(pub u16);

impl ReportMode {
    pub const REAL_TIME: ReportMode = ReportMode(0x0001);
    pub const END_OF_SCAN_CYCLE: ReportMode = ReportMode(0x0002);
    pub const NO_BATCH: ReportMode = ReportMode(0x0004);
    pub const BUFFER_FULL: ReportMode = ReportMode(0x0008);

    /// Translate a bucket's report events. ePNO forces `NO_BATCH`.
    pub fn derive(events: ReportEvents, epno_active: bool) -> ReportMode {
        let mut mode = 0u16;
        if events.is_empty() {
            mode = Self::BUFFER_FULL.0;
        } else {
            if events.contains(ReportEvents::EACH_SCAN) {
                mode |= Self::END_OF_SCAN_CYCLE.0;
            }
            if events.contains(ReportEvents::FULL_RESULTS) {
                mode |= Self::REAL_TIME.0;
            }
            if events.contains(ReportEvents::NO_BATCH) {
                mode |= Self::NO_BATCH.0;
            }
        }
        if epno_active {
            mode |= Self::NO_BATCH.0;
        }
        ReportMode(mode)
    }

    pub const fn contains(self, other: ReportMode) -> bool {
        self.0 & other.0 == other.0
    }
}

// ── Scan group request ───────────────────────────────────────────────

/// Channel list of a bucket, in MHz.
pub type ChannelList = heapless::Vec<u32, MAX_CHANNELS_PER_BUCKET>;

/// One bucket of a scan group request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub band: Band,
    pub channels: ChannelList,
    pub period_ms: u32,
    pub report_events: ReportEvents,
    /// Exponential back-off parameters; passed through to the firmware.
    pub exponent: u32,
    pub step_count: u32,
    pub max_period_ms: u32,
}

impl BucketSpec {
    pub fn new(band: Band, period_ms: u32) -> Self {
        Self {
            band,
            channels: ChannelList::new(),
            period_ms,
            report_events: ReportEvents::NONE,
            exponent: 0,
            step_count: 0,
            max_period_ms: 0,
        }
    }

    /// Replace the channel list. Fails if more than the per-bucket maximum.
    pub fn with_channels(mut self, channels: &[u32]) -> Result<Self, GscanError> {
        self.channels = ChannelList::from_slice(channels)
            .map_err(|_| GscanError::InvalidParams("too many channels in bucket"))?;
        Ok(self)
    }

    pub fn with_report_events(mut self, events: ReportEvents) -> Self {
        self.report_events = events;
        self
    }

    /// Spec of the implicit bucket used for significant-change tracking.
    pub fn tracking() -> Self {
        Self::new(Band::Unspecified, crate::defaults::DEFAULT_TRACKING_PERIOD_MS)
    }
}

/// A client request to add a scan group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanGroupParams {
    pub base_period_ms: u32,
    pub max_ap_per_scan: u32,
    /// Percent of the cache capacity at which a batch event is raised.
    pub report_threshold_percent: u32,
    /// Raise a batch event every N completed scans. 0 disables the check.
    pub report_threshold_num_scans: u32,
    pub buckets: heapless::Vec<BucketSpec, MAX_BUCKETS>,
}

impl ScanGroupParams {
    pub fn new(buckets: &[BucketSpec]) -> Result<Self, GscanError> {
        Ok(Self {
            base_period_ms: 0,
            max_ap_per_scan: MAX_AP_CACHE_PER_SCAN,
            report_threshold_percent: MAX_SCAN_REPORTING_THRESHOLD,
            report_threshold_num_scans: 0,
            buckets: heapless::Vec::from_slice(buckets)
                .map_err(|_| GscanError::InvalidParams("too many buckets"))?,
        })
    }

    pub fn with_thresholds(mut self, percent: u32, num_scans: u32) -> Self {
        self.report_threshold_percent = percent;
        self.report_threshold_num_scans = num_scans;
        self
    }

    /// Check the request against the firmware limits.
    pub fn verify(&self) -> Result<(), GscanError> {
        if self.max_ap_per_scan > MAX_AP_CACHE_PER_SCAN {
            log::error!("Invalid max_ap_per_scan: {}", self.max_ap_per_scan);
            return Err(GscanError::InvalidParams("max_ap_per_scan out of range"));
        }
        if self.report_threshold_percent > MAX_SCAN_REPORTING_THRESHOLD {
            log::error!(
                "Invalid report_threshold_percent: {}",
                self.report_threshold_percent
            );
            return Err(GscanError::InvalidParams("report_threshold_percent out of range"));
        }
        if self.buckets.is_empty() {
            return Err(GscanError::InvalidParams("scan group has no buckets"));
        }
        for bucket in self.buckets.iter() {
            if bucket.band == Band::Unspecified && bucket.channels.is_empty() {
                log::error!("Bucket has neither band nor channels");
                return Err(GscanError::InvalidParams("bucket needs a band or channels"));
            }
        }
        Ok(())
    }
}

// ── Watch lists ──────────────────────────────────────────────────────

/// A watched BSSID with its RSSI band, used by hotlist and significant change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApThreshold {
    pub bssid: Bssid,
    pub low: i8,
    pub high: i8,
}

impl ApThreshold {
    pub const fn new(bssid: Bssid, low: i8, high: i8) -> Self {
        Self { bssid, low, high }
    }

    /// True if `rssi` lies inside `[low, high]`.
    pub fn contains(&self, rssi: i16) -> bool {
        rssi >= self.low as i16 && rssi <= self.high as i16
    }
}

/// A client request to set the significant-change watch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificantChangeParams {
    pub rssi_sample_size: u16,
    pub lost_ap_sample_size: u16,
    /// Consecutive out-of-band samples before a change is reported.
    pub min_breaching: u16,
    pub aps: Vec<ApThreshold>,
}

impl SignificantChangeParams {
    pub fn new(aps: Vec<ApThreshold>) -> Self {
        Self {
            rssi_sample_size: MAX_RSSI_SAMPLE_SIZE,
            lost_ap_sample_size: 0,
            min_breaching: 1,
            aps,
        }
    }

    /// Number of entries that will actually be tracked.
    pub fn effective_len(&self) -> usize {
        self.aps.len().min(MAX_SIGNIFICANT_CHANGE_APS)
    }
}
