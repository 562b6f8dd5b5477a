//! End-of-cycle batch reporting decision.

use serde::Serialize;

use crate::config::ReportEvents;

/// Why a batch event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchReason {
    /// The bucket reports at the end of each scan.
    ResultsAvailable,
    /// The group completed a multiple of its scan-count threshold.
    ThresholdNumScans,
    /// Cache occupancy reached the buffer threshold.
    ThresholdPercent,
}

/// Inputs for one completed scan cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleStats {
    pub report_events: ReportEvents,
    /// Scans completed by the owning group, including this one.
    pub num_scans: u32,
    pub threshold_num_scans: u32,
    pub bytes_consumed: usize,
    pub buffer_threshold: usize,
}

/// Flags for the events to raise; any combination may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchDecision {
    pub results_available: bool,
    pub threshold_num_scans: bool,
    pub threshold_percent: bool,
}

impl BatchDecision {
    pub fn is_empty(&self) -> bool {
        !(self.results_available || self.threshold_num_scans || self.threshold_percent)
    }

    /// Raised reasons in priority order.
    pub fn reasons(&self) -> impl Iterator<Item = BatchReason> {
        [
            (self.results_available, BatchReason::ResultsAvailable),
            (self.threshold_num_scans, BatchReason::ThresholdNumScans),
            (self.threshold_percent, BatchReason::ThresholdPercent),
        ]
        .into_iter()
        .filter_map(|(set, reason)| set.then_some(reason))
    }
}

pub struct EventBatcher;

impl EventBatcher {
    pub fn evaluate(stats: &CycleStats) -> BatchDecision {
        BatchDecision {
            results_available: stats.report_events.contains(ReportEvents::EACH_SCAN),
            threshold_num_scans: stats.threshold_num_scans != 0
                && stats.num_scans % stats.threshold_num_scans == 0,
            threshold_percent: stats.bytes_consumed >= stats.buffer_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> CycleStats {
        CycleStats {
            report_events: ReportEvents::NONE,
            num_scans: 1,
            threshold_num_scans: 0,
            bytes_consumed: 0,
            buffer_threshold: 1000,
        }
    }

    #[test]
    fn nothing_raised_is_empty() {
        let d = EventBatcher::evaluate(&stats());
        assert!(d.is_empty());
        assert_eq!(d.reasons().count(), 0);
    }

    #[test]
    fn each_scan_raises_results_available() {
        let s = CycleStats {
            report_events: ReportEvents::EACH_SCAN | ReportEvents::FULL_RESULTS,
            ..stats()
        };
        let d = EventBatcher::evaluate(&s);
        assert!(d.results_available);
        assert!(!d.threshold_num_scans);
    }

    #[test]
    fn num_scans_threshold_zero_is_skipped() {
        let s = CycleStats {
            num_scans: 0,
            threshold_num_scans: 0,
            ..stats()
        };
        assert!(!EventBatcher::evaluate(&s).threshold_num_scans);
    }

    #[test]
    fn num_scans_threshold_fires_on_multiples() {
        for (n, expected) in [(3, false), (4, true), (7, false), (8, true)] {
            let s = CycleStats {
                num_scans: n,
                threshold_num_scans: 4,
                ..stats()
            };
            assert_eq!(EventBatcher::evaluate(&s).threshold_num_scans, expected, "n={n}");
        }
    }

    #[test]
    fn percent_threshold_is_inclusive() {
        let s = CycleStats {
            bytes_consumed: 1000,
            ..stats()
        };
        assert!(EventBatcher::evaluate(&s).threshold_percent);
        let s = CycleStats {
            bytes_consumed: 999,
            ..stats()
        };
        assert!(!EventBatcher::evaluate(&s).threshold_percent);
    }

    #[test]
    fn all_three_can_fire_together_in_priority_order() {
        let s = CycleStats {
            report_events: ReportEvents::EACH_SCAN,
            num_scans: 2,
            threshold_num_scans: 2,
            bytes_consumed: 5000,
            buffer_threshold: 1000,
        };
        let reasons: Vec<BatchReason> = EventBatcher::evaluate(&s).reasons().collect();
        assert_eq!(
            reasons,
            [
                BatchReason::ResultsAvailable,
                BatchReason::ThresholdNumScans,
                BatchReason::ThresholdPercent
            ]
        );
    }
}
