//! The scan cache engine.
//!
//! [`ScanCacheState`] holds every piece of mutable state for one interface:
//! the result cache, the bucket pool, active scan groups, the hotlist,
//! significant-change tracking and roam staging. All operations are `&mut
//! self` methods. [`GscanEngine`] wraps the state in a mutex; holding its
//! guard is holding the scan lock, so each operation is atomic with respect
//! to every other.
//!
//! Configuration calls either complete or leave the state as it was.
//! Ingestion calls never fail; problems are logged and the item dropped.

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::batch::{CycleStats, EventBatcher};
use crate::bssid::Bssid;
use crate::bucket::{BucketHandle, BucketHandles, BucketRegistry, ScanId};
use crate::cache::{AdmitOutcome, ScanResultCache};
use crate::config::{
    ApThreshold, BucketSpec, CacheConfig, ReportEvents, ReportMode, ScanGroupParams,
    SignificantChangeParams,
};
use crate::defaults::{
    MAX_AP_CACHE_PER_SCAN, MAX_BUCKETS, MAX_HOTLIST_APS, MAX_RSSI_SAMPLE_SIZE,
    MAX_SCAN_REPORTING_THRESHOLD, MAX_SIGNIFICANT_CHANGE_APS, RSSI_HISTORY_DEPTH,
};
use crate::error::{DispatchError, GscanError};
use crate::hotlist::HotlistTracker;
use crate::port::{EventSink, GscanEvent, ScanDispatcher, ScanRequest};
use crate::result::{ResultEntry, ScanIndication};
use crate::significant::{ChangeRecord, RssiReport, SignificantChangeTracker, TrackingBucket};
use crate::staging::{RoamCandidate, RoamCandidateStaging};

/// Client-visible handle of a scan group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A set of buckets added by one configuration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanGroup {
    id: GroupId,
    buckets: BucketHandles,
    report_threshold_percent: u32,
    report_threshold_num_scans: u32,
    num_scans: u32,
    for_change_tracking: bool,
}

impl ScanGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn buckets(&self) -> &[BucketHandle] {
        &self.buckets
    }

    pub fn report_threshold_percent(&self) -> u32 {
        self.report_threshold_percent
    }

    pub fn num_scans(&self) -> u32 {
        self.num_scans
    }

    /// Created implicitly to host significant-change tracking.
    pub fn is_for_change_tracking(&self) -> bool {
        self.for_change_tracking
    }
}

/// Limits reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub max_scan_cache_size: usize,
    pub max_scan_buckets: usize,
    pub max_ap_cache_per_scan: u32,
    pub max_rssi_sample_size: u16,
    pub max_scan_reporting_threshold: u32,
    pub max_hotlist_aps: usize,
    pub max_significant_wifi_change_aps: usize,
    pub max_bssid_history_entries: usize,
}

pub struct ScanCacheState<D, S> {
    config: CacheConfig,
    cache: ScanResultCache,
    registry: BucketRegistry,
    /// Oldest first.
    groups: Vec<ScanGroup>,
    buffer_threshold: usize,
    hotlist: HotlistTracker,
    significant: SignificantChangeTracker,
    staging: RoamCandidateStaging,
    epno_active: bool,
    next_group_id: u32,
    dispatcher: D,
    sink: S,
}

impl<D: ScanDispatcher, S: EventSink> ScanCacheState<D, S> {
    pub fn new(config: CacheConfig, dispatcher: D, sink: S) -> Self {
        log::info!("Scan cache up: {} bytes", config.capacity_bytes);
        Self {
            config,
            cache: ScanResultCache::new(config.capacity_bytes),
            registry: BucketRegistry::new(),
            groups: Vec::new(),
            buffer_threshold: 0,
            hotlist: HotlistTracker::new(),
            significant: SignificantChangeTracker::new(),
            staging: RoamCandidateStaging::new(),
            epno_active: false,
            next_group_id: 1,
            dispatcher,
            sink,
        }
    }

    // ── Scan groups ──────────────────────────────────────────────────

    /// Allocate buckets for `params` and start a firmware scan on each.
    ///
    /// If any scan fails to start, the scans already started are stopped in
    /// reverse order and every bucket is returned to the pool.
    pub fn add_scan_group(&mut self, params: &ScanGroupParams) -> Result<GroupId, GscanError> {
        params.verify()?;
        self.groups.try_reserve(1)?;

        let id = self.alloc_group_id();
        let handles = self.registry.alloc(params.buckets.len(), id)?;
        for (handle, spec) in handles.iter().zip(params.buckets.iter()) {
            if let Some(bucket) = self.registry.get_mut(*handle) {
                bucket.report_events = spec.report_events;
                bucket.spec = Some(spec.clone());
            }
        }

        for (handle, spec) in handles.iter().zip(params.buckets.iter()) {
            if let Err(source) = self.start_bucket(*handle, spec) {
                log::error!(
                    "Failed to start scan {} of group {}: {}, rolling back",
                    handle.scan_id(),
                    id,
                    source
                );
                self.teardown_buckets(&handles);
                return Err(GscanError::Dispatch {
                    bucket: handle.index(),
                    source,
                });
            }
        }

        self.groups.push(ScanGroup {
            id,
            buckets: handles,
            report_threshold_percent: params.report_threshold_percent,
            report_threshold_num_scans: params.report_threshold_num_scans,
            num_scans: 0,
            for_change_tracking: false,
        });
        self.recompute_threshold();
        log::info!(
            "Scan group {} added: {} buckets, threshold {} bytes",
            id,
            params.buckets.len(),
            self.buffer_threshold
        );
        Ok(id)
    }

    /// Stop and release one group. Cached results are kept.
    pub fn delete_scan_group(&mut self, id: GroupId) -> Result<(), GscanError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(GscanError::UnknownGroup(id))?;
        let group = self.groups.remove(pos);

        if let Some(tracking) = self.significant.tracking() {
            if tracking.group == id {
                log::warn!("Deleting group {} which hosts significant change tracking", id);
                self.significant.clear_tracking();
            }
        }

        self.teardown_buckets(&group.buckets);
        self.recompute_threshold();
        log::info!("Scan group {} deleted", id);
        Ok(())
    }

    /// Stop every group, newest first, and flush the result cache.
    pub fn delete_all_scan_groups(&mut self) {
        let groups = core::mem::take(&mut self.groups);
        for group in groups.iter().rev() {
            self.teardown_buckets(&group.buckets);
        }
        self.significant.clear_tracking();
        self.cache.flush();
        self.buffer_threshold = 0;
        log::info!("All scan groups deleted ({})", groups.len());
    }

    /// Move out up to `max` cached results.
    pub fn get_results(&mut self, max: usize) -> Vec<ResultEntry> {
        let results = self.cache.take_up_to(max);
        log::debug!(
            "Returning {} results, {} remain ({} bytes)",
            results.len(),
            self.cache.len(),
            self.cache.bytes_consumed()
        );
        results
    }

    // ── Hotlist ──────────────────────────────────────────────────────

    /// Program the hotlist watch list. At most [`MAX_HOTLIST_APS`] entries
    /// are used; the found list starts over. Returns the number stored.
    pub fn set_hotlist(&mut self, aps: &[ApThreshold]) -> Result<usize, GscanError> {
        let capped = &aps[..aps.len().min(MAX_HOTLIST_APS)];
        self.dispatcher
            .configure_hotlist(capped)
            .map_err(GscanError::Firmware)?;

        self.hotlist.flush();
        let stored = self.hotlist.set_watch_list(aps);
        log::info!("Hotlist set: {} APs", stored);
        Ok(stored)
    }

    pub fn reset_hotlist(&mut self) {
        if let Err(err) = self.dispatcher.configure_hotlist(&[]) {
            log::error!("Failed to clear firmware hotlist: {}", err);
        }
        self.hotlist.reset();
        log::info!("Hotlist reset");
    }

    /// Called by the external aging logic when hotlist APs disappear.
    ///
    /// Each BSSID leaves both the cache and the found list. A BSSID missing
    /// from the found list is logged and skipped. One `HotlistLost` event is
    /// always emitted, possibly empty.
    pub fn on_hotlist_lost(&mut self, bssids: &[Bssid]) {
        let mut lost = Vec::with_capacity(bssids.len());
        for bssid in bssids {
            self.cache.remove(bssid);
            match self.hotlist.on_lost(bssid) {
                Some(entry) => {
                    log::debug!("Hotlist AP lost: {}", bssid);
                    lost.push(entry.summary().without_ies());
                }
                None => log::warn!("Lost AP {} is not on the hotlist", bssid),
            }
        }
        self.sink.emit(GscanEvent::HotlistLost(lost));
    }

    // ── Significant change ───────────────────────────────────────────

    /// Register APs for significant RSSI change monitoring.
    ///
    /// The first call binds a tracking bucket: the first bucket of the newest
    /// scan group if one exists, otherwise a dedicated single-bucket group.
    /// Returns the number of tracked APs.
    pub fn set_significant_change(
        &mut self,
        params: &SignificantChangeParams,
    ) -> Result<usize, GscanError> {
        let (binding, created) = match self.significant.tracking() {
            Some(binding) => (binding, false),
            None => (self.acquire_tracking_bucket()?, true),
        };

        let mut capped = None;
        if params.effective_len() < params.aps.len() {
            let mut trimmed = params.clone();
            trimmed.aps.truncate(params.effective_len());
            capped = Some(trimmed);
        }
        let programmed = capped.as_ref().unwrap_or(params);

        if let Err(source) = self
            .dispatcher
            .configure_significant_change(binding.handle.scan_id(), programmed)
        {
            log::error!("Firmware rejected significant change list: {}", source);
            if created {
                self.release_tracking(binding);
            }
            return Err(GscanError::Firmware(source));
        }

        if created {
            self.significant.set_tracking(binding);
        }
        Ok(self.significant.configure(params))
    }

    /// Stop significant change monitoring. The tracking bucket is released
    /// only if it was allocated for tracking alone.
    pub fn reset_significant_change(&mut self) {
        let Some(binding) = self.significant.reset() else {
            return;
        };
        let cleared = SignificantChangeParams::new(Vec::new());
        if let Err(err) = self
            .dispatcher
            .configure_significant_change(binding.handle.scan_id(), &cleared)
        {
            log::error!("Failed to clear firmware significant change: {}", err);
        }
        self.release_tracking(binding);
        log::info!("Significant change reset");
    }

    /// Emit firmware-computed significant change records.
    pub fn on_significant_change_ind(&mut self, reports: &[RssiReport]) {
        if reports.is_empty() {
            return;
        }
        let records: Vec<ChangeRecord> = reports.iter().map(ChangeRecord::from).collect();
        self.sink.emit(GscanEvent::SignificantChange(records));
    }

    fn acquire_tracking_bucket(&mut self) -> Result<TrackingBucket, GscanError> {
        if let Some(group) = self.groups.last() {
            if let Some(&handle) = group.buckets.first() {
                log::info!(
                    "Significant change tracking on scan {} of group {}",
                    handle.scan_id(),
                    group.id
                );
                return Ok(TrackingBucket {
                    handle,
                    group: group.id,
                    exclusive: false,
                });
            }
        }

        self.groups.try_reserve(1)?;
        let id = self.alloc_group_id();
        let handles = self.registry.alloc(1, id)?;
        let Some(&handle) = handles.first() else {
            return Err(GscanError::InsufficientCapacity {
                requested: 1,
                available: 0,
            });
        };

        let spec = BucketSpec::tracking();
        if let Some(bucket) = self.registry.get_mut(handle) {
            bucket.for_change_tracking = true;
            bucket.spec = Some(spec.clone());
        }
        if let Err(source) = self.start_bucket(handle, &spec) {
            log::error!("Failed to start tracking scan {}: {}", handle.scan_id(), source);
            self.teardown_buckets(&handles);
            return Err(GscanError::Dispatch {
                bucket: handle.index(),
                source,
            });
        }

        self.groups.push(ScanGroup {
            id,
            buckets: handles,
            report_threshold_percent: MAX_SCAN_REPORTING_THRESHOLD,
            report_threshold_num_scans: 0,
            num_scans: 0,
            for_change_tracking: true,
        });
        self.recompute_threshold();
        log::info!(
            "Significant change tracking on dedicated scan {} (group {})",
            handle.scan_id(),
            id
        );
        Ok(TrackingBucket {
            handle,
            group: id,
            exclusive: true,
        })
    }

    fn release_tracking(&mut self, binding: TrackingBucket) {
        if !binding.exclusive {
            return;
        }
        if let Some(pos) = self.groups.iter().position(|g| g.id == binding.group) {
            let group = self.groups.remove(pos);
            self.teardown_buckets(&group.buckets);
            self.recompute_threshold();
        }
    }

    // ── Ingestion ────────────────────────────────────────────────────

    /// Process one AP sighting for the bucket scanning as `scan_id`.
    ///
    /// Returns the cache decision, or `None` if the indication was dropped
    /// before reaching the cache.
    pub fn on_scan_indication(
        &mut self,
        scan_id: ScanId,
        ind: ScanIndication,
    ) -> Option<AdmitOutcome> {
        let Some(bucket) = self
            .registry
            .lookup_scan_id(scan_id)
            .and_then(|h| self.registry.get(h))
        else {
            log::warn!("Scan result for unknown scan {}, dropped", scan_id);
            return None;
        };
        let cycle = bucket.scan_cycle;
        let report_events = bucket.report_events;
        let bucket_mask = bucket.mask();

        let is_hotlist_hit = ind.is_hotlist_hit;
        let is_watchlist_hit = ind.is_watchlist_hit;
        let has_anqp = !ind.anqp_bytes.is_empty();
        let entry = ResultEntry::from_indication(ind, cycle);
        log::debug!(
            "Scan {}: {} {:?} {} dBm {} MHz",
            scan_id,
            entry.bssid,
            entry.ssid.as_str(),
            entry.rssi,
            entry.channel_freq
        );

        if is_hotlist_hit {
            match self.hotlist.on_found(entry.clone()) {
                Ok(()) => self.sink.emit(GscanEvent::HotlistFound(self.hotlist.summaries())),
                Err(err) => log::warn!("Hotlist AP {} dropped: {}", entry.bssid, err),
            }
        } else if is_watchlist_hit {
            if has_anqp {
                self.sink.emit(GscanEvent::HotspotMatch(entry.clone()));
            } else {
                self.sink.emit(GscanEvent::EpnoMatch(entry.summary()));
            }
        }

        if report_events.contains(ReportEvents::FULL_RESULTS) {
            self.sink.emit(GscanEvent::FullScanResult {
                bucket_mask,
                result: entry.clone(),
            });
        }

        if let Err(err) = self
            .significant
            .evaluate(&entry.bssid, entry.channel_freq, entry.rssi)
        {
            log::warn!("Significant change sample for {} dropped: {}", entry.bssid, err);
        }

        match self.cache.admit(entry, cycle) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                log::warn!("Scan result dropped: {}", err);
                None
            }
        }
    }

    /// A bucket finished one scan cycle. Raises batch events and flushes
    /// staged significant changes if this is the tracking bucket.
    pub fn on_scan_done(&mut self, scan_id: ScanId) {
        let Some(handle) = self.registry.lookup_scan_id(scan_id) else {
            log::warn!("Scan done for unknown scan {}", scan_id);
            return;
        };
        let Some(bucket) = self.registry.get_mut(handle) else {
            return;
        };
        bucket.scan_cycle = bucket.scan_cycle.wrapping_add(1);
        let report_events = bucket.report_events;
        let owner = bucket.owner;

        match owner.and_then(|id| self.groups.iter_mut().find(|g| g.id == id)) {
            Some(group) => {
                group.num_scans = group.num_scans.wrapping_add(1);
                let stats = CycleStats {
                    report_events,
                    num_scans: group.num_scans,
                    threshold_num_scans: group.report_threshold_num_scans,
                    bytes_consumed: self.cache.bytes_consumed(),
                    buffer_threshold: self.buffer_threshold,
                };
                for reason in EventBatcher::evaluate(&stats).reasons() {
                    log::debug!("Scan {} done: batch event {:?}", scan_id, reason);
                    self.sink.emit(GscanEvent::BatchThresholdReached(reason));
                }
            }
            None => log::warn!("Scan {} has no owning group", scan_id),
        }

        if self.significant.tracking().map(|t| t.handle) == Some(handle) {
            let staged = self.significant.take_staged();
            if !staged.is_empty() {
                self.sink.emit(GscanEvent::SignificantChange(staged));
            }
        }
    }

    // ── Roam staging ─────────────────────────────────────────────────

    pub fn begin_roam_scan(&mut self) {
        self.staging.begin();
    }

    pub fn stage_roam_candidate(&mut self, candidate: RoamCandidate) {
        self.staging.stage(candidate);
    }

    /// Emit the staged candidates. Returns false if no roam scan was open.
    pub fn finish_roam_scan(&mut self) -> bool {
        match self.staging.finish() {
            Some(candidates) => {
                self.sink.emit(GscanEvent::RoamCandidates(candidates));
                true
            }
            None => false,
        }
    }

    // ── Misc ─────────────────────────────────────────────────────────

    /// While ePNO is active every newly started scan runs without batching.
    pub fn set_epno_active(&mut self, active: bool) {
        if self.epno_active != active {
            log::info!("ePNO {}", if active { "enabled" } else { "disabled" });
        }
        self.epno_active = active;
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_scan_cache_size: self.config.capacity_bytes,
            max_scan_buckets: MAX_BUCKETS,
            max_ap_cache_per_scan: MAX_AP_CACHE_PER_SCAN,
            max_rssi_sample_size: MAX_RSSI_SAMPLE_SIZE,
            max_scan_reporting_threshold: MAX_SCAN_REPORTING_THRESHOLD,
            max_hotlist_aps: MAX_HOTLIST_APS,
            max_significant_wifi_change_aps: MAX_SIGNIFICANT_CHANGE_APS,
            max_bssid_history_entries: RSSI_HISTORY_DEPTH,
        }
    }

    /// Interface going down: stop every scan and drop all state.
    pub fn teardown(&mut self) {
        let groups = core::mem::take(&mut self.groups);
        for group in groups.iter().rev() {
            self.teardown_buckets(&group.buckets);
        }
        self.registry.free_all();
        self.significant.reset();
        self.hotlist.reset();
        self.staging.discard();
        self.cache.flush();
        self.buffer_threshold = 0;
        log::info!("Scan cache torn down");
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn cache(&self) -> &ScanResultCache {
        &self.cache
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    pub fn groups(&self) -> &[ScanGroup] {
        &self.groups
    }

    pub fn buffer_threshold(&self) -> usize {
        self.buffer_threshold
    }

    pub fn hotlist(&self) -> &HotlistTracker {
        &self.hotlist
    }

    pub fn significant(&self) -> &SignificantChangeTracker {
        &self.significant
    }

    pub fn staging(&self) -> &RoamCandidateStaging {
        &self.staging
    }

    pub fn epno_active(&self) -> bool {
        self.epno_active
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ── Internals ────────────────────────────────────────────────────

    fn alloc_group_id(&mut self) -> GroupId {
        let id = GroupId(self.next_group_id);
        self.next_group_id = self.next_group_id.wrapping_add(1).max(1);
        id
    }

    fn start_bucket(&mut self, handle: BucketHandle, spec: &BucketSpec) -> Result<(), DispatchError> {
        let request = ScanRequest {
            scan_id: handle.scan_id(),
            spec: spec.clone(),
            report_mode: ReportMode::derive(spec.report_events, self.epno_active),
            scan_policy: spec.band.scan_policy(),
        };
        self.dispatcher.start_scan(&request)?;
        if let Some(bucket) = self.registry.get_mut(handle) {
            bucket.started = true;
        }
        log::debug!(
            "Scan {} started: period {} ms, mode {:#06x}",
            request.scan_id,
            spec.period_ms,
            request.report_mode.0
        );
        Ok(())
    }

    /// Stop started scans in reverse order, then free every bucket.
    fn teardown_buckets(&mut self, handles: &[BucketHandle]) {
        for handle in handles.iter().rev() {
            if self.registry.get(*handle).is_some_and(|b| b.started) {
                self.dispatcher.stop_scan(handle.scan_id());
            }
        }
        self.registry.free(handles);
    }

    fn recompute_threshold(&mut self) {
        self.buffer_threshold = self
            .groups
            .iter()
            .map(|g| self.config.threshold_bytes(g.report_threshold_percent))
            .min()
            .unwrap_or(0);
    }
}

/// Mutex-guarded engine shared between the control path and the
/// indication path.
pub struct GscanEngine<D, S> {
    state: Mutex<ScanCacheState<D, S>>,
}

impl<D: ScanDispatcher, S: EventSink> GscanEngine<D, S> {
    pub fn new(config: CacheConfig, dispatcher: D, sink: S) -> Self {
        Self {
            state: Mutex::new(ScanCacheState::new(config, dispatcher, sink)),
        }
    }

    /// Take the scan lock. A panic while holding it does not wedge the
    /// engine; the state is used as left.
    pub fn lock(&self) -> MutexGuard<'_, ScanCacheState<D, S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> ScanCacheState<D, S> {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
