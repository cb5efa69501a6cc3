//! Property-based invariant tests for dependency tracking.
//!
//! These verify the structural invariants of the watcher/dep wiring for
//! **any** read pattern:
//!
//! 1. After an evaluation, the watcher's subscription set equals exactly the
//!    deps of the keys read during that evaluation.
//! 2. Re-evaluating with a different read set drops every stale subscription.
//! 3. A lazy evaluator runs at most once between two dependency
//!    notifications, regardless of read count in between.
//! 4. Writing a value equal to the current one triggers zero re-evaluations.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use trellis_reactive::{Computed, ReactiveMap, TrackCx, Watcher};

const KEYS: [&str; 6] = ["k0", "k1", "k2", "k3", "k4", "k5"];

fn state_with_keys() -> ReactiveMap {
    let map = ReactiveMap::new();
    for (i, key) in KEYS.iter().enumerate() {
        map.define(*key, i as i64);
    }
    map
}

/// A subset of `KEYS` as a boolean mask.
fn key_mask() -> impl Strategy<Value = [bool; 6]> {
    proptest::array::uniform6(any::<bool>())
}

proptest! {
    #[test]
    fn subscription_set_equals_read_set(first in key_mask(), second in key_mask()) {
        let cx = TrackCx::new();
        let map = state_with_keys();
        let mask = Rc::new(RefCell::new(first));

        let (m, mask2) = (map.clone(), Rc::clone(&mask));
        let watcher = Watcher::eager(&cx, move |cx| {
            for (i, key) in KEYS.iter().enumerate() {
                if mask2.borrow()[i] {
                    let _ = m.get(cx, key);
                }
            }
        });

        let expect_subs = |mask: &[bool; 6]| -> Result<(), TestCaseError> {
            for (i, key) in KEYS.iter().enumerate() {
                let dep = map.key_dep(key).expect("defined key");
                let expected = usize::from(mask[i]);
                prop_assert_eq!(dep.subscriber_count(), expected);
            }
            Ok(())
        };
        expect_subs(&first)?;
        prop_assert_eq!(watcher.dep_count(), first.iter().filter(|&&b| b).count());

        // Re-evaluate against a different read set: stale subscriptions from
        // the previously-read branch must be gone.
        *mask.borrow_mut() = second;
        watcher.update();
        expect_subs(&second)?;
        prop_assert_eq!(watcher.dep_count(), second.iter().filter(|&&b| b).count());
    }

    #[test]
    fn lazy_evaluator_runs_at_most_once_between_notifications(
        ops in proptest::collection::vec(prop_oneof![Just(false), Just(true)], 1..40,)
    ) {
        // `false` = read the computed, `true` = mutate its dependency.
        let cx = TrackCx::new();
        let map = state_with_keys();
        let evals = Rc::new(Cell::new(0u32));

        let (m, evals2) = (map.clone(), Rc::clone(&evals));
        let computed = Computed::new(&cx, move |cx| {
            evals2.set(evals2.get() + 1);
            m.get(cx, "k0")
        });

        let mut writes = 0u32;
        let mut next = 1i64;
        for op in ops {
            if op {
                map.set("k0", next).expect("reactive key");
                next += 1;
                writes += 1;
            } else {
                let _ = computed.get();
                let _ = computed.get();
            }
        }
        let _ = computed.get();
        // One evaluation per dirtying write at most, plus the initial one.
        prop_assert!(evals.get() <= writes + 1);
        prop_assert_eq!(computed.version(), u64::from(evals.get()));
    }

    #[test]
    fn equal_write_is_a_no_op(value in -100i64..100) {
        let cx = TrackCx::new();
        let map = state_with_keys();
        map.set("k0", value).expect("reactive key");

        let runs = Rc::new(Cell::new(0u32));
        let (m, runs2) = (map.clone(), Rc::clone(&runs));
        let _watcher = Watcher::eager(&cx, move |cx| {
            runs2.set(runs2.get() + 1);
            let _ = m.get(cx, "k0");
        });
        let before = runs.get();
        map.set("k0", value).expect("reactive key");
        prop_assert_eq!(runs.get(), before);
    }
}
