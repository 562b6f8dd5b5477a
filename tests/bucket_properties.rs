use gscan_cache::defaults::MAX_BUCKETS;
use gscan_cache::{
    Band, BucketSpec, CacheConfig, DispatchError, GscanError, GscanEvent, ScanDispatcher, ScanId,
    ScanCacheState, ScanGroupParams, ScanRequest,
};
use proptest::prelude::*;

/// Starts succeed unless the start ordinal is listed in `failures`.
#[derive(Default)]
struct ScriptedDispatcher {
    failures: Vec<usize>,
    calls: usize,
    running: Vec<ScanId>,
}

impl ScanDispatcher for ScriptedDispatcher {
    fn start_scan(&mut self, request: &ScanRequest) -> Result<(), DispatchError> {
        let n = self.calls;
        self.calls += 1;
        if self.failures.contains(&n) {
            return Err(DispatchError::new(-16));
        }
        self.running.push(request.scan_id);
        Ok(())
    }

    fn stop_scan(&mut self, scan_id: ScanId) {
        self.running.retain(|id| *id != scan_id);
    }
}

type State = ScanCacheState<ScriptedDispatcher, Vec<GscanEvent>>;

fn params(n: usize) -> ScanGroupParams {
    let buckets: Vec<BucketSpec> = (0..n).map(|_| BucketSpec::new(Band::Abg, 20_000)).collect();
    ScanGroupParams::new(&buckets).unwrap()
}

fn used_snapshot(state: &State) -> Vec<(usize, Option<u32>)> {
    state
        .registry()
        .iter_used()
        .map(|b| (b.index(), b.owner.map(|g| g.0)))
        .collect()
}

proptest! {
    #[test]
    fn failed_add_leaves_pool_unchanged(
        sizes in prop::collection::vec(1usize..=MAX_BUCKETS, 1..12),
        failures in prop::collection::vec(0usize..40, 0..6),
    ) {
        let dispatcher = ScriptedDispatcher { failures, ..Default::default() };
        let mut state = State::new(CacheConfig::default(), dispatcher, Vec::new());

        for n in sizes {
            let before = used_snapshot(&state);
            match state.add_scan_group(&params(n)) {
                Ok(_) => prop_assert_eq!(state.registry().iter_used().count(), before.len() + n),
                Err(GscanError::InsufficientCapacity { requested, available }) => {
                    prop_assert_eq!(requested, n);
                    prop_assert!(available < n);
                    prop_assert_eq!(used_snapshot(&state), before);
                }
                Err(GscanError::Dispatch { .. }) => {
                    prop_assert_eq!(used_snapshot(&state), before);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
            // every used bucket has a running scan and vice versa
            let mut used: Vec<ScanId> = state.registry().iter_used().map(|b| b.scan_id()).collect();
            let mut running = state.dispatcher().running.clone();
            used.sort_by_key(|id| id.0);
            running.sort_by_key(|id| id.0);
            prop_assert_eq!(used, running);
        }
    }

    #[test]
    fn delete_all_returns_every_bucket(
        sizes in prop::collection::vec(1usize..=4, 1..6),
    ) {
        let mut state = State::new(CacheConfig::default(), ScriptedDispatcher::default(), Vec::new());
        for n in sizes {
            let _ = state.add_scan_group(&params(n));
        }
        state.delete_all_scan_groups();
        prop_assert_eq!(state.registry().free_count(), MAX_BUCKETS);
        prop_assert!(state.dispatcher().running.is_empty());
        prop_assert_eq!(state.buffer_threshold(), 0);
    }
}
