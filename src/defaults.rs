//! Compile-time limits for the scan result cache.
//!
//! Values match the limits the firmware reports through the capabilities
//! query, so the host never configures more than the radio can track.

/// Total bytes of serialized scan results the cache may hold.
pub const MAX_SCAN_CACHE_SIZE: usize = 12_000;

/// Number of scan buckets in the shared pool.
pub const MAX_BUCKETS: usize = 8;

/// First firmware scan identifier. Bucket `i` always scans as `SCAN_ID_BASE + i`.
pub const SCAN_ID_BASE: u16 = 0x0410;

/// Number of hash slots in the result cache. Must be a power of two.
pub const HASH_SLOTS: usize = 32;

/// Mask applied to the last BSSID octet to pick a hash slot.
pub const HASH_KEY_MASK: u8 = (HASH_SLOTS - 1) as u8;

/// Upper bound for `max_ap_per_scan` in a scan group request.
pub const MAX_AP_CACHE_PER_SCAN: u32 = 32;

/// Upper bound for the percent-full reporting threshold.
pub const MAX_SCAN_REPORTING_THRESHOLD: u32 = 100;

/// Maximum number of channels a single bucket may list.
pub const MAX_CHANNELS_PER_BUCKET: usize = 16;

/// Maximum BSSIDs on the hotlist watch list.
pub const MAX_HOTLIST_APS: usize = 64;

/// Maximum BSSIDs watched for significant RSSI change.
pub const MAX_SIGNIFICANT_CHANGE_APS: usize = 64;

/// Depth of the RSSI history carried by a change record.
pub const RSSI_HISTORY_DEPTH: usize = 8;

/// Largest RSSI sample window a client may request.
pub const MAX_RSSI_SAMPLE_SIZE: u16 = RSSI_HISTORY_DEPTH as u16;

/// Filler for unused RSSI history slots.
pub const INVALID_RSSI: i16 = 0x7FFF;

/// Period of the implicit bucket created for significant-change tracking.
pub const DEFAULT_TRACKING_PERIOD_MS: u32 = 5_000;

/// Fixed per-result overhead added to the IE length.
///
/// Covers timestamp (8), SSID (33), BSSID (6), channel (4), RSSI (4),
/// RTT and RTT deviation (16), beacon period (2), capability (2) and the
/// IE length field (4).
pub const RESULT_HEADER_LEN: usize = 79;
