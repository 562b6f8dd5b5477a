//! gscan-cache: scan-result caching and change detection for background
//! WiFi scanning.
//!
//! The engine ingests access-point sightings from periodic firmware scans,
//! deduplicates them under a shared byte budget, and raises events when
//! watched BSSIDs appear or disappear (hotlist), when a watched AP's RSSI
//! leaves its band (significant change), or when buffered results cross a
//! reporting threshold (batching).
//!
//! The crate has no platform dependencies. Hosts provide two seams:
//! - a [`ScanDispatcher`] that starts and stops firmware scans, and
//! - an [`EventSink`] that delivers events ([`NdjsonSink`] writes NDJSON).
//!
//! All state for an interface lives in [`ScanCacheState`]; [`GscanEngine`]
//! puts it behind the scan lock.

pub mod batch;
pub mod bssid;
pub mod bucket;
pub mod cache;
pub mod comm;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod hotlist;
pub mod port;
pub mod protocol;
pub mod result;
pub mod significant;
pub mod staging;

pub use bssid::Bssid;
pub use bucket::{BucketHandle, ScanId};
pub use cache::{AdmitOutcome, DiscardReason, ScanResultCache};
pub use comm::NdjsonSink;
pub use config::{
    ApThreshold, Band, BucketSpec, CacheConfig, ReportEvents, ScanGroupParams,
    SignificantChangeParams,
};
pub use engine::{GroupId, GscanEngine, ScanCacheState};
pub use error::{DispatchError, GscanError};
pub use port::{EventSink, GscanEvent, ScanDispatcher, ScanRequest};
pub use result::{ResultEntry, ResultSummary, ScanIndication};
