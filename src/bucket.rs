//! Fixed pool of scan buckets.
//!
//! A bucket is one schedulable scan unit: a channel set or band, a period and
//! a reporting policy. The pool holds [`MAX_BUCKETS`] slots. Slots are handed
//! out as [`BucketHandle`]s carrying a generation, so a handle kept past
//! [`BucketRegistry::free`] no longer resolves.
//!
//! Bucket `i` always scans under firmware identifier `SCAN_ID_BASE + i`.

use core::fmt;

use crate::config::{BucketSpec, ReportEvents};
use crate::defaults::{MAX_BUCKETS, SCAN_ID_BASE};
use crate::engine::GroupId;
use crate::error::GscanError;

/// Firmware-facing scan identifier of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(pub u16);

impl ScanId {
    /// Pool index this identifier maps to, if it lies in the bucket range.
    pub fn bucket_index(self) -> Option<usize> {
        let index = self.0.checked_sub(SCAN_ID_BASE)? as usize;
        (index < MAX_BUCKETS).then_some(index)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Typed reference to an allocated bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketHandle {
    index: u8,
    generation: u32,
}

impl BucketHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn scan_id(&self) -> ScanId {
        ScanId(SCAN_ID_BASE + self.index as u16)
    }
}

/// Handles returned by a single allocation.
pub type BucketHandles = heapless::Vec<BucketHandle, MAX_BUCKETS>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    index: u8,
    used: bool,
    generation: u32,
    pub owner: Option<GroupId>,
    pub report_events: ReportEvents,
    /// Completed scan cycles since allocation.
    pub scan_cycle: u32,
    /// Created implicitly for significant-change tracking.
    pub for_change_tracking: bool,
    /// Set once the firmware scan for this bucket has been started.
    pub started: bool,
    pub spec: Option<BucketSpec>,
}

impl Bucket {
    const fn empty(index: u8) -> Self {
        Self {
            index,
            used: false,
            generation: 0,
            owner: None,
            report_events: ReportEvents::NONE,
            scan_cycle: 0,
            for_change_tracking: false,
            started: false,
            spec: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn handle(&self) -> BucketHandle {
        BucketHandle {
            index: self.index,
            generation: self.generation,
        }
    }

    pub fn scan_id(&self) -> ScanId {
        self.handle().scan_id()
    }

    /// Bit of this bucket in a full-result bucket mask.
    pub fn mask(&self) -> u32 {
        1 << self.index
    }

    fn release(&mut self) {
        self.used = false;
        self.generation = self.generation.wrapping_add(1);
        self.owner = None;
        self.report_events = ReportEvents::NONE;
        self.scan_cycle = 0;
        self.for_change_tracking = false;
        self.started = false;
        self.spec = None;
    }
}

pub struct BucketRegistry {
    buckets: [Bucket; MAX_BUCKETS],
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self {
            buckets: core::array::from_fn(|i| Bucket::empty(i as u8)),
        }
    }

    /// Reserve `n` free buckets for `owner`, lowest index first.
    ///
    /// Either all `n` are allocated or the pool is left untouched.
    pub fn alloc(&mut self, n: usize, owner: GroupId) -> Result<BucketHandles, GscanError> {
        let available = self.free_count();
        if n > available {
            log::warn!("Bucket pool exhausted: {} requested, {} free", n, available);
            return Err(GscanError::InsufficientCapacity {
                requested: n,
                available,
            });
        }

        debug_assert!(n <= MAX_BUCKETS);
        let mut handles = BucketHandles::new();
        for bucket in self.buckets.iter_mut().filter(|b| !b.used).take(n) {
            bucket.used = true;
            bucket.owner = Some(owner);
            bucket.scan_cycle = 0;
            let _ = handles.push(bucket.handle());
        }
        Ok(handles)
    }

    /// Return buckets to the pool. Stale or already-freed handles are ignored.
    pub fn free(&mut self, handles: &[BucketHandle]) {
        for handle in handles {
            if let Some(bucket) = self.get_mut(*handle) {
                bucket.release();
            }
        }
    }

    /// Release every used bucket.
    pub fn free_all(&mut self) {
        for bucket in self.buckets.iter_mut().filter(|b| b.used) {
            bucket.release();
        }
    }

    pub fn scan_id_for(&self, handle: BucketHandle) -> ScanId {
        handle.scan_id()
    }

    /// Resolve a firmware scan identifier to a live bucket.
    pub fn lookup_scan_id(&self, scan_id: ScanId) -> Option<BucketHandle> {
        let bucket = &self.buckets[scan_id.bucket_index()?];
        bucket.used.then(|| bucket.handle())
    }

    pub fn get(&self, handle: BucketHandle) -> Option<&Bucket> {
        self.buckets
            .get(handle.index())
            .filter(|b| b.used && b.generation == handle.generation)
    }

    pub fn get_mut(&mut self, handle: BucketHandle) -> Option<&mut Bucket> {
        self.buckets
            .get_mut(handle.index())
            .filter(|b| b.used && b.generation == handle.generation)
    }

    pub fn free_count(&self) -> usize {
        self.buckets.iter().filter(|b| !b.used).count()
    }

    pub fn iter_used(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(|b| b.used)
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new()
    }
}
