//! Property tests for value-based change detection.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use proptest::prelude::*;
use serde_json::Value;

use offerte_autosave::{AutoSaveConfig, Fingerprint, Reconciler, Snapshot};

fn line_items() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-z]{1,8}", -10_000i64..10_000), 0..12)
}

proptest! {
    #[test]
    fn insertion_order_never_changes_the_fingerprint(items in line_items()) {
        let unique: BTreeMap<String, i64> = items.iter().cloned().collect();
        prop_assume!(unique.len() == items.len());
        let forward: HashMap<String, i64> = items.iter().cloned().collect();
        let backward: HashMap<String, i64> = items.iter().rev().cloned().collect();

        prop_assert_eq!(
            Fingerprint::of(&forward).unwrap(),
            Fingerprint::of(&backward).unwrap()
        );
        prop_assert_eq!(
            Fingerprint::of(&forward).unwrap(),
            Fingerprint::of(&unique).unwrap()
        );
    }

    #[test]
    fn observing_the_baseline_is_always_a_no_op(items in line_items()) {
        let value: Value = serde_json::to_value(
            items.iter().cloned().collect::<BTreeMap<String, i64>>()
        ).unwrap();
        let mut reconciler = Reconciler::new(
            Snapshot::capture(value.clone()).unwrap(),
            AutoSaveConfig::default(),
        );

        let effects = reconciler.observe(Snapshot::capture(value).unwrap(), Instant::now());
        prop_assert!(effects.is_empty());
        prop_assert!(!reconciler.is_dirty());
        prop_assert!(reconciler.pending_timer().is_none());
    }

    #[test]
    fn any_real_difference_marks_dirty(items in line_items(), extra in 1i64..1000) {
        let baseline: BTreeMap<String, i64> = items.iter().cloned().collect();
        let mut edited = baseline.clone();
        *edited.entry("total".to_string()).or_insert(0) += extra;

        let mut reconciler = Reconciler::new(
            Snapshot::capture(baseline).unwrap(),
            AutoSaveConfig::default(),
        );
        reconciler.observe(Snapshot::capture(edited).unwrap(), Instant::now());
        prop_assert!(reconciler.is_dirty());
        prop_assert!(reconciler.pending_timer().is_some());
    }
}
