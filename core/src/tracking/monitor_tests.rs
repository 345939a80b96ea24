//! Tests for container content monitoring

use super::*;
use crate::host::{FrameLoop, HostSignal, ItemId, Notification, Sandbox, SignalSource};

const POTION: i32 = 398;
const JUNK: i32 = 5;

fn notifications(sandbox: &mut Sandbox) -> Vec<Notification> {
    sandbox
        .drain_signals()
        .into_iter()
        .filter_map(|signal| match signal {
            HostSignal::Changed(n) => Some(n),
            _ => None,
        })
        .collect()
}

/// Route every queued notification, true if any reported a change
fn deliver(sandbox: &mut Sandbox, monitor: &mut ContainerMonitor) -> bool {
    let mut changed = false;
    for note in notifications(sandbox) {
        changed |= monitor.handle_notification(sandbox, &note).unwrap_or(false);
    }
    changed
}

/// Container with potions in slot 0 and junk in slot 1
fn stocked_container(sandbox: &mut Sandbox, potions: u32) -> (ItemId, ItemId, ItemId) {
    let container = sandbox.create_container(882, 4);
    let potion = sandbox.create_item(POTION, potions);
    let junk = sandbox.create_item(JUNK, 1);
    let s0 = sandbox.container_slot(container, 0).unwrap();
    let s1 = sandbox.container_slot(container, 1).unwrap();
    sandbox.place_in_slot(s0, potion).unwrap();
    sandbox.place_in_slot(s1, junk).unwrap();
    (container, potion, junk)
}

#[test]
fn test_add_container_snapshots_and_subscribes() {
    let mut sandbox = Sandbox::new();
    let (container, potion, junk) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);

    assert!(monitor.add_container(&mut sandbox, container));
    assert!(!monitor.add_container(&mut sandbox, container));

    let snapshot = monitor.snapshot(container).unwrap();
    assert_eq!(snapshot.get(&POTION), Some(&3));
    assert_eq!(snapshot.get(&JUNK), Some(&1));

    // Four slots plus stack and tree for the mapped item only
    assert_eq!(monitor.subscription_count(), 6);
    assert!(sandbox.is_subscribed(SignalSource::StackCount(potion)));
    assert!(sandbox.is_subscribed(SignalSource::ItemTree(potion)));
    assert!(!sandbox.is_subscribed(SignalSource::StackCount(junk)));
}

#[test]
fn test_stack_change_is_reported_once() {
    let mut sandbox = Sandbox::new();
    let (container, potion, _) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, container);

    sandbox.set_stack(potion, 2).unwrap();
    let notes = notifications(&mut sandbox);
    // Stack and tree signals for the same edit
    assert_eq!(notes.len(), 2);
    assert_eq!(monitor.handle_notification(&mut sandbox, &notes[0]), Some(true));
    assert_eq!(monitor.handle_notification(&mut sandbox, &notes[1]), Some(false));
    assert_eq!(monitor.snapshot(container).unwrap().get(&POTION), Some(&2));
}

#[test]
fn test_slot_swap_moves_item_subscriptions() {
    let mut sandbox = Sandbox::new();
    let (container, potion, _) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, container);

    let fresh = sandbox.create_item(POTION, 5);
    let s0 = sandbox.container_slot(container, 0).unwrap();
    sandbox.place_in_slot(s0, fresh).unwrap();
    assert!(deliver(&mut sandbox, &mut monitor));

    assert!(sandbox.is_subscribed(SignalSource::StackCount(fresh)));
    assert!(!sandbox.is_subscribed(SignalSource::StackCount(potion)));
    assert_eq!(monitor.snapshot(container).unwrap().get(&POTION), Some(&5));

    // The displaced stack no longer reaches the monitor
    sandbox.set_stack(potion, 1).unwrap();
    assert!(notifications(&mut sandbox).is_empty());
}

#[test]
fn test_unrelated_edit_reports_no_change() {
    let mut sandbox = Sandbox::new();
    let (container, _, junk) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, container);

    // Same junk back into the same slot
    let s1 = sandbox.container_slot(container, 1).unwrap();
    sandbox.place_in_slot(s1, junk).unwrap();
    assert!(!deliver(&mut sandbox, &mut monitor));
}

#[test]
fn test_totals_sum_across_containers() {
    let mut sandbox = Sandbox::new();
    let (a, _, _) = stocked_container(&mut sandbox, 2);
    let (b, _, _) = stocked_container(&mut sandbox, 4);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, a);
    monitor.add_container(&mut sandbox, b);

    let totals = monitor.total_item_counts(&sandbox);
    assert_eq!(totals.get(&POTION), Some(&6));
    assert_eq!(totals.get(&JUNK), Some(&2));
}

#[test]
fn test_remove_container_unsubscribes_everything() {
    let mut sandbox = Sandbox::new();
    let (container, potion, _) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, container);

    assert!(monitor.remove_container(&mut sandbox, container));
    assert!(!monitor.remove_container(&mut sandbox, container));
    assert_eq!(sandbox.subscription_count(), 0);
    assert_eq!(monitor.subscription_count(), 0);
    assert!(monitor.total_item_counts(&sandbox).is_empty());

    sandbox.set_stack(potion, 0).unwrap();
    assert!(notifications(&mut sandbox).is_empty());
}

#[test]
fn test_refresh_all_detects_silent_changes() {
    let mut sandbox = Sandbox::new();
    let (container, potion, _) = stocked_container(&mut sandbox, 3);
    let mut monitor = ContainerMonitor::new([POTION]);
    monitor.add_container(&mut sandbox, container);

    sandbox.set_stack(potion, 1).unwrap();
    // Drop the signals on the floor
    notifications(&mut sandbox);

    assert!(monitor.refresh_all(&mut sandbox));
    assert!(!monitor.refresh_all(&mut sandbox));
}
