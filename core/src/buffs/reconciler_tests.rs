//! Tests for pass coalescing and action planning

use std::collections::BTreeSet;

use super::*;
use crate::config::BuffConfig;
use crate::tracking::AggregatedCounts;

fn counts(rows: &[(i32, u32)]) -> AggregatedCounts {
    rows.iter().copied().collect()
}

fn set(ids: &[i32]) -> BTreeSet<i32> {
    ids.iter().copied().collect()
}

#[test]
fn test_requests_coalesce_until_taken() {
    let mut reconciler = BuffReconciler::new();
    assert_eq!(reconciler.state(), PassState::Idle);

    assert!(reconciler.request_pass());
    assert!(!reconciler.request_pass());
    assert!(!reconciler.request_pass());
    assert_eq!(reconciler.requests_coalesced(), 2);

    assert!(reconciler.take_scheduled());
    assert_eq!(reconciler.state(), PassState::Idle);
    assert!(!reconciler.take_scheduled());
}

#[test]
fn test_desired_set_respects_threshold() {
    let config = BuffConfig::defaults();
    // Default threshold is three
    let desired = derive_desired(&counts(&[(398, 3), (137, 2), (9999, 10)]), &config);
    assert_eq!(desired, set(&[1012]));
}

#[test]
fn test_unions_buffs_of_all_qualifying_items() {
    let mut config = BuffConfig::defaults();
    config.insert_mapping(398, 2000);
    let desired = derive_desired(&counts(&[(398, 5), (137, 4)]), &config);
    assert_eq!(desired, set(&[1011, 1012, 2000]));
}

#[test]
fn test_pass_orders_adds_by_priority_and_removes_in_reverse() {
    let config = BuffConfig::defaults();
    let mut reconciler = BuffReconciler::new();

    let summary = reconciler.run_pass(
        &counts(&[(137, 3), (1400, 3), (1401, 3)]),
        &config,
        &set(&[1012, 1019]),
    );
    assert_eq!(summary.desired, set(&[1011, 1206, 1207]));
    assert_eq!((summary.adds, summary.removes), (3, 2));

    let actions: Vec<BuffAction> = reconciler.pending().copied().collect();
    assert_eq!(
        actions,
        vec![
            BuffAction::Add(1207),
            BuffAction::Add(1206),
            BuffAction::Add(1011),
            BuffAction::Remove(1019),
            BuffAction::Remove(1012),
        ]
    );
}

#[test]
fn test_new_pass_replaces_pending_actions() {
    let config = BuffConfig::defaults();
    let mut reconciler = BuffReconciler::new();

    reconciler.run_pass(&counts(&[(137, 3), (398, 3)]), &config, &BTreeSet::new());
    assert_eq!(reconciler.next_action(), Some(BuffAction::Add(1011)));

    // 1012 is no longer wanted before it was ever added
    reconciler.run_pass(&counts(&[(137, 3)]), &config, &set(&[1011]));
    assert_eq!(reconciler.pending_len(), 0);
    assert_eq!(reconciler.passes_run(), 2);
}

#[test]
fn test_clear_drops_queue_and_schedule() {
    let config = BuffConfig::defaults();
    let mut reconciler = BuffReconciler::new();
    reconciler.run_pass(&counts(&[(398, 3)]), &config, &BTreeSet::new());
    reconciler.request_pass();

    reconciler.clear();
    assert_eq!(reconciler.next_action(), None);
    assert_eq!(reconciler.state(), PassState::Idle);
}
