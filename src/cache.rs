//! Budget-bounded, BSSID-keyed store of scan results.
//!
//! Results hash into one of [`HASH_SLOTS`] chains by the low bits of the last
//! BSSID octet. Each chain is an owned vector; newest entries sit at the tail,
//! so draining pops the most recent sighting of every chain first.
//!
//! Two counters track the store: `count` (live entries) and `bytes_consumed`
//! (sum of [`ResultEntry::size`]). Both change only together with the chains,
//! and `bytes_consumed` stays strictly below the configured capacity.

use crate::bssid::Bssid;
use crate::defaults::HASH_SLOTS;
use crate::error::GscanError;
use crate::result::ResultEntry;

/// Outcome of offering a result to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// New BSSID, stored.
    Inserted,
    /// Existing entry for this BSSID was replaced.
    Replaced,
    /// Nothing changed.
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Storing the result would reach the byte budget.
    BufferFull,
    /// Same scan cycle, and the stored sighting has the stronger signal.
    WeakerSignal,
}

pub struct ScanResultCache {
    slots: [Vec<ResultEntry>; HASH_SLOTS],
    capacity: usize,
    bytes_consumed: usize,
    count: usize,
}

impl ScanResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: core::array::from_fn(|_| Vec::new()),
            capacity,
            bytes_consumed: 0,
            count: 0,
        }
    }

    /// Offer `entry`, observed during `current_cycle` of its bucket.
    ///
    /// A new BSSID is stored if it fits the budget. A known BSSID is replaced
    /// unless the stored sighting is from the same cycle with a stronger
    /// RSSI; replacement may proceed even when the cache is near full, as
    /// long as the size difference still fits.
    ///
    /// Returns `Err(OutOfMemory)` if chain storage cannot grow; the cache is
    /// unchanged in that case.
    pub fn admit(
        &mut self,
        entry: ResultEntry,
        current_cycle: u32,
    ) -> Result<AdmitOutcome, GscanError> {
        let slot = &mut self.slots[entry.bssid.hash_key()];

        let Some(pos) = slot.iter().position(|e| e.bssid == entry.bssid) else {
            if self.bytes_consumed + entry.size() >= self.capacity {
                log::debug!(
                    "Scan buffer full, discarding {}: consumed {} + {} >= {}",
                    entry.bssid,
                    self.bytes_consumed,
                    entry.size(),
                    self.capacity
                );
                return Ok(AdmitOutcome::Discarded(DiscardReason::BufferFull));
            }
            slot.try_reserve(1)?;
            self.bytes_consumed += entry.size();
            self.count += 1;
            slot.push(entry);
            return Ok(AdmitOutcome::Inserted);
        };

        let existing = &slot[pos];
        if existing.scan_cycle == current_cycle && entry.rssi < existing.rssi {
            log::debug!(
                "Keeping {} at {} dBm over {} dBm (cycle {})",
                entry.bssid,
                existing.rssi,
                entry.rssi,
                current_cycle
            );
            return Ok(AdmitOutcome::Discarded(DiscardReason::WeakerSignal));
        }

        let consumed_after = self.bytes_consumed - existing.size() + entry.size();
        if consumed_after > self.capacity {
            log::debug!(
                "Scan buffer full, cannot grow {} from {} to {} bytes",
                entry.bssid,
                existing.size(),
                entry.size()
            );
            return Ok(AdmitOutcome::Discarded(DiscardReason::BufferFull));
        }

        slot[pos] = entry;
        self.bytes_consumed = consumed_after;
        Ok(AdmitOutcome::Replaced)
    }

    /// Remove and return the entry for `bssid`, if cached.
    pub fn remove(&mut self, bssid: &Bssid) -> Option<ResultEntry> {
        let slot = &mut self.slots[bssid.hash_key()];
        let pos = slot.iter().position(|e| e.bssid == *bssid)?;
        let entry = slot.remove(pos);
        self.bytes_consumed -= entry.size();
        self.count -= 1;
        Some(entry)
    }

    pub fn get(&self, bssid: &Bssid) -> Option<&ResultEntry> {
        self.slots[bssid.hash_key()]
            .iter()
            .find(|e| e.bssid == *bssid)
    }

    pub fn contains(&self, bssid: &Bssid) -> bool {
        self.get(bssid).is_some()
    }

    /// Move out up to `n` entries, slot by slot, newest first within a slot.
    pub fn take_up_to(&mut self, n: usize) -> Vec<ResultEntry> {
        let mut taken = Vec::with_capacity(n.min(self.count));
        for slot in self.slots.iter_mut() {
            while taken.len() < n {
                let Some(entry) = slot.pop() else { break };
                self.bytes_consumed -= entry.size();
                self.count -= 1;
                taken.push(entry);
            }
            if taken.len() == n {
                break;
            }
        }
        taken
    }

    /// Move out every entry.
    pub fn drain_all(&mut self) -> Vec<ResultEntry> {
        self.take_up_to(usize::MAX)
    }

    /// Drop every entry.
    pub fn flush(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.count = 0;
        self.bytes_consumed = 0;
        log::debug!("Scan result cache flushed");
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.slots.iter().flat_map(|slot| slot.iter())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
