//! Tests for the buff manager against the sandbox host

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::config::BuffConfig;
use crate::host::{BuffTemplate, Clock, DurationOverride, Sandbox, StatusEffects};

const CARRY: i32 = 1012;
const SUPERIOR: i32 = 1207;
const INFERIOR: i32 = 1206;

fn template(id: i32, secs: f32) -> BuffTemplate {
    BuffTemplate {
        id,
        name: format!("buff{id}"),
        limited_lifetime: true,
        total_lifetime: secs,
    }
}

fn sandbox() -> Sandbox {
    let mut sandbox = Sandbox::new();
    sandbox.spawn_player(4);
    sandbox.register_template(template(CARRY, 30.0));
    sandbox.register_template(template(1011, 30.0));
    sandbox.register_template(template(INFERIOR, 120.0));
    sandbox.register_template(template(SUPERIOR, 120.0));
    sandbox.set_usage_grants(398, vec![CARRY]);
    sandbox.set_usage_grants(1401, vec![SUPERIOR]);
    sandbox
}

fn manager() -> BuffManager {
    BuffManager::new(Arc::new(BuffConfig::defaults()))
}

fn is_persistent(sandbox: &Sandbox, id: i32) -> bool {
    sandbox
        .find_buff(id)
        .is_some_and(|b| b.is_persistent_override())
}

// ═══════════════════════════════════════════════════════════════════════════
// Adding
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_add_applies_persistent_override() {
    let mut host = sandbox();
    let mut manager = manager();

    manager.add_buff(&mut host, CARRY);
    assert!(is_persistent(&host, CARRY));
    assert_eq!(manager.state(CARRY), Some(BuffState::Applied));

    // Already owned
    manager.add_buff(&mut host, CARRY);
    assert_eq!(host.stats().add_calls, 1);
}

#[test]
fn test_add_without_template_is_skipped() {
    let mut host = sandbox();
    let mut manager = manager();

    manager.add_buff(&mut host, 4242);
    assert!(manager.active_buffs().is_empty());
    assert_eq!(host.stats().add_calls, 0);
}

#[test]
fn test_rejected_add_is_not_recorded() {
    let mut host = sandbox();
    host.reject_buff(CARRY);
    let mut manager = manager();

    manager.add_buff(&mut host, CARRY);
    assert_eq!(manager.state(CARRY), None);
    assert!(!host.has_buff(CARRY));
}

#[test]
fn test_failed_override_rolls_back_add() {
    let mut host = sandbox();
    host.set_duration_fields_missing(true);
    let mut manager = manager();

    manager.add_buff(&mut host, CARRY);
    assert!(!host.has_buff(CARRY));
    assert_eq!(manager.state(CARRY), None);
}

// ═══════════════════════════════════════════════════════════════════════════
// Removing
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_withdrawn_buff_is_removed() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);

    manager.remove_buff(&mut host, CARRY);
    assert!(!host.has_buff(CARRY));
    assert!(manager.active_buffs().is_empty());
}

#[test]
fn test_fresh_consumption_hands_buff_back_to_host_timer() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);

    host.advance(Duration::from_secs(5));
    manager.record_usage(398, [CARRY], host.now());
    host.advance(Duration::from_millis(200));
    manager.remove_buff(&mut host, CARRY);

    let instance = host.find_buff(CARRY).unwrap();
    assert!(instance.limited_lifetime);
    assert_eq!(instance.total_lifetime, 30.0);
    assert_eq!(manager.state(CARRY), None);
}

#[test]
fn test_stale_consumption_counts_as_withdrawal() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);

    manager.record_usage(398, [CARRY], host.now());
    host.advance(Duration::from_secs(1));
    manager.remove_buff(&mut host, CARRY);

    assert!(!host.has_buff(CARRY));
}

#[test]
fn test_consumption_not_granted_by_host_counts_as_withdrawal() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);

    // Mapped in config, but the host's own usage grants nothing
    manager.record_usage(398, Vec::new(), host.now());
    manager.remove_buff(&mut host, CARRY);

    assert!(!host.has_buff(CARRY));
}

#[test]
fn test_non_persistent_instance_is_left_alone() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);
    host.reset_duration(CARRY, &template(CARRY, 30.0)).unwrap();

    let removes = host.stats().remove_calls;
    manager.remove_buff(&mut host, CARRY);
    assert!(host.has_buff(CARRY));
    assert_eq!(host.stats().remove_calls, removes);
    assert_eq!(manager.state(CARRY), None);
}

#[test]
fn test_removing_unknown_buff_is_noop() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.remove_buff(&mut host, CARRY);
    assert_eq!(host.stats().remove_calls, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Conflict pairs
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_inferior_is_suppressed_under_superior() {
    let mut host = sandbox();
    let mut manager = manager();

    manager.add_buff(&mut host, SUPERIOR);
    manager.add_buff(&mut host, INFERIOR);

    assert_eq!(manager.state(INFERIOR), Some(BuffState::Suppressed));
    assert!(!host.has_buff(INFERIOR));
    assert!(is_persistent(&host, SUPERIOR));
}

#[test]
fn test_superior_demotes_applied_inferior() {
    let mut host = sandbox();
    let mut manager = manager();

    manager.add_buff(&mut host, INFERIOR);
    manager.add_buff(&mut host, SUPERIOR);

    assert!(!host.has_buff(INFERIOR));
    assert!(is_persistent(&host, SUPERIOR));
    assert_eq!(manager.state(INFERIOR), Some(BuffState::Suppressed));
}

#[test]
fn test_rejected_superior_restores_inferior() {
    let mut host = sandbox();
    host.reject_buff(SUPERIOR);
    let mut manager = manager();

    manager.add_buff(&mut host, INFERIOR);
    manager.add_buff(&mut host, SUPERIOR);

    assert!(is_persistent(&host, INFERIOR));
    assert_eq!(manager.state(INFERIOR), Some(BuffState::Applied));
    assert_eq!(manager.state(SUPERIOR), None);
}

#[test]
fn test_locked_inferior_keeps_superior_out() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, INFERIOR);
    host.lock_buff(INFERIOR);

    manager.add_buff(&mut host, SUPERIOR);

    assert!(is_persistent(&host, INFERIOR));
    assert!(!host.has_buff(SUPERIOR));
    assert_eq!(manager.state(INFERIOR), Some(BuffState::Applied));
    assert_eq!(manager.state(SUPERIOR), None);
}

#[test]
fn test_host_timed_inferior_is_not_clobbered_by_superior() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, INFERIOR);
    host.reset_duration(INFERIOR, &template(INFERIOR, 120.0)).unwrap();

    let removes_before = host.stats().remove_calls;
    manager.add_buff(&mut host, SUPERIOR);

    assert_eq!(host.stats().remove_calls, removes_before);
    assert!(host.has_buff(INFERIOR));
    assert!(!is_persistent(&host, INFERIOR));
    assert!(!host.has_buff(SUPERIOR));
    assert_eq!(manager.state(SUPERIOR), None);
}

#[test]
fn test_removing_superior_reveals_inferior() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, SUPERIOR);
    manager.add_buff(&mut host, INFERIOR);

    manager.remove_buff(&mut host, SUPERIOR);
    assert!(!host.has_buff(SUPERIOR));
    assert!(is_persistent(&host, INFERIOR));
    assert_eq!(manager.state(INFERIOR), Some(BuffState::Applied));
}

#[test]
fn test_consumed_superior_still_falls_through_to_inferior() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, SUPERIOR);
    manager.add_buff(&mut host, INFERIOR);

    manager.record_usage(1401, [SUPERIOR], host.now());
    manager.remove_buff(&mut host, SUPERIOR);

    assert!(!host.has_buff(SUPERIOR));
    assert!(is_persistent(&host, INFERIOR));
}

#[test]
fn test_removing_suppressed_inferior_touches_nothing() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, SUPERIOR);
    manager.add_buff(&mut host, INFERIOR);

    let before = host.stats();
    manager.remove_buff(&mut host, INFERIOR);
    assert_eq!(host.stats(), before);
    assert_eq!(manager.state(INFERIOR), None);
    assert!(is_persistent(&host, SUPERIOR));
}

// ═══════════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_prune_drops_buffs_the_host_lost() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);
    manager.add_buff(&mut host, 1011);

    host.remove_buff(CARRY, false).unwrap();
    assert_eq!(manager.prune_expired(&mut host), vec![CARRY]);
    assert_eq!(manager.state(1011), Some(BuffState::Applied));
}

#[test]
fn test_release_all_removes_only_persistent_instances() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, CARRY);
    manager.add_buff(&mut host, 1011);
    host.reset_duration(1011, &template(1011, 30.0)).unwrap();

    manager.release_all(&mut host);
    assert!(!host.has_buff(CARRY));
    assert!(host.has_buff(1011));
    assert!(manager.active_buffs().is_empty());
}

#[test]
fn test_pruned_superior_reveals_suppressed_inferior() {
    let mut host = sandbox();
    let mut manager = manager();
    manager.add_buff(&mut host, SUPERIOR);
    manager.add_buff(&mut host, INFERIOR);

    // Cleared by gameplay, not by the manager
    host.remove_buff(SUPERIOR, false).unwrap();

    assert_eq!(manager.prune_expired(&mut host), vec![SUPERIOR]);
    assert!(is_persistent(&host, INFERIOR));
    assert_eq!(manager.state(INFERIOR), Some(BuffState::Applied));
    assert_eq!(manager.state(SUPERIOR), None);
}
