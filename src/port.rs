//! Boundaries to the outside: events going up, scan requests going down.

use crate::batch::BatchReason;
use crate::bucket::ScanId;
use crate::config::{ApThreshold, BucketSpec, ReportMode, ScanPolicy, SignificantChangeParams};
use crate::error::DispatchError;
use crate::result::{ResultEntry, ResultSummary};
use crate::significant::ChangeRecord;
use crate::staging::RoamCandidate;

/// Events raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GscanEvent {
    /// Every AP currently on the hotlist found list, newest first.
    HotlistFound(Vec<ResultSummary>),
    /// APs reported lost in one notification. May be empty.
    HotlistLost(Vec<ResultSummary>),
    SignificantChange(Vec<ChangeRecord>),
    BatchThresholdReached(BatchReason),
    /// A result forwarded as it arrived, for buckets with full-result reporting.
    FullScanResult { bucket_mask: u32, result: ResultEntry },
    /// Preferred network sighting.
    EpnoMatch(ResultSummary),
    /// Preferred network sighting with ANQP payload.
    HotspotMatch(ResultEntry),
    RoamCandidates(Vec<RoamCandidate>),
}

impl GscanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GscanEvent::HotlistFound(_) => "hotlist_found",
            GscanEvent::HotlistLost(_) => "hotlist_lost",
            GscanEvent::SignificantChange(_) => "significant_change",
            GscanEvent::BatchThresholdReached(_) => "batch",
            GscanEvent::FullScanResult { .. } => "full_result",
            GscanEvent::EpnoMatch(_) => "epno_match",
            GscanEvent::HotspotMatch(_) => "hotspot_match",
            GscanEvent::RoamCandidates(_) => "roam_candidates",
        }
    }
}

/// Receiver of engine events. Called with the scan lock held; must not block.
pub trait EventSink {
    fn emit(&mut self, event: GscanEvent);
}

impl EventSink for Vec<GscanEvent> {
    fn emit(&mut self, event: GscanEvent) {
        self.push(event);
    }
}

/// Everything the firmware needs to start one bucket's scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub scan_id: ScanId,
    pub spec: BucketSpec,
    pub report_mode: ReportMode,
    pub scan_policy: ScanPolicy,
}

/// Firmware scan control. Called with the scan lock held; must not block.
pub trait ScanDispatcher {
    fn start_scan(&mut self, request: &ScanRequest) -> Result<(), DispatchError>;

    fn stop_scan(&mut self, scan_id: ScanId);

    /// Program the firmware hotlist. An empty list clears it.
    fn configure_hotlist(&mut self, _aps: &[ApThreshold]) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Program significant-change monitoring on the tracking scan.
    /// An empty AP list clears it.
    fn configure_significant_change(
        &mut self,
        _scan_id: ScanId,
        _params: &SignificantChangeParams,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}
