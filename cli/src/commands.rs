use std::io::Write;
use std::path::Path;

use stashbuff_core::host::{InventoryId, ItemId, SlotId, StatusEffects, World};
use stashbuff_core::{BuffState, ParentOwner};

use crate::CliContext;

pub fn load_config(
    path: &str,
    template: Option<&str>,
    ctx: &mut CliContext,
) -> Result<(), String> {
    ctx.reload(Path::new(path), template.map(Path::new))?;
    let config = ctx.config();
    println!(
        "Loaded {} item mappings from {} (container {}, threshold {})",
        config.item_types().count(),
        path,
        config.settings.target_container_id,
        config.settings.required_item_count,
    );
    println!("Run `area` to start a session");
    Ok(())
}

pub fn enter_area(excluded: bool, ctx: &mut CliContext) -> Result<(), String> {
    ctx.enter_area(excluded)?;
    println!(
        "Area loaded ({}), engine {:?}",
        if excluded { "excluded" } else { "regular" },
        ctx.engine.area_state()
    );
    Ok(())
}

/// Where a new container should go
pub enum Placement<'a> {
    Inventory(usize),
    Pet(usize),
    Slot(&'a str),
}

pub fn spawn_container(
    slots: usize,
    placement: Placement<'_>,
    ctx: &mut CliContext,
) -> Result<(), String> {
    let target = ctx.config().settings.target_container_id;
    let container = ctx.sandbox.create_container(target, slots);

    match placement {
        Placement::Inventory(index) => {
            let inventory = player_inventory(ctx)?;
            ctx.sandbox
                .place_in_inventory(inventory, index, container)
                .map_err(|e| e.to_string())?;
        }
        Placement::Pet(index) => {
            let inventory = ctx.sandbox.pet_inventory().ok_or("no pet in this area")?;
            ctx.sandbox
                .place_in_inventory(inventory, index, container)
                .map_err(|e| e.to_string())?;
        }
        Placement::Slot(name) => {
            let slot = named_slot(ctx, name)?;
            ctx.sandbox
                .place_in_slot(slot, container)
                .map_err(|e| e.to_string())?;
        }
    }

    println!("Container {} ({} slots)", container.0, slots);
    Ok(())
}

pub fn put(
    container: u64,
    index: usize,
    item_type: i32,
    count: u32,
    ctx: &mut CliContext,
) -> Result<(), String> {
    let slot = ctx
        .sandbox
        .container_slot(ItemId(container), index)
        .ok_or_else(|| format!("container {container} has no slot {index}"))?;
    let item = ctx.sandbox.create_item(item_type, count);
    ctx.sandbox
        .place_in_slot(slot, item)
        .map_err(|e| e.to_string())?;
    println!("Item {} ({} x type {})", item.0, count, item_type);
    Ok(())
}

pub fn set_stack(item: u64, count: u32, ctx: &mut CliContext) -> Result<(), String> {
    ctx.sandbox
        .set_stack(ItemId(item), count)
        .map_err(|e| e.to_string())
}

pub fn take(item: u64, ctx: &mut CliContext) -> Result<(), String> {
    ctx.sandbox.detach(ItemId(item)).map_err(|e| e.to_string())
}

pub fn use_item(item: u64, ctx: &mut CliContext) -> Result<(), String> {
    ctx.sandbox.use_item(ItemId(item)).map_err(|e| e.to_string())
}

pub fn frame(count: usize, ctx: &mut CliContext) {
    ctx.engine.run_frames(&mut ctx.sandbox, count);
    println!("Ran {count} frame(s), tick {}", ctx.engine.ticks());
}

pub fn status(ctx: &CliContext) {
    let engine = &ctx.engine;
    println!(
        "Area: {:?}  tick: {}  passes: {}  pass state: {:?}",
        engine.area_state(),
        engine.ticks(),
        engine.passes_run(),
        engine.pass_state()
    );

    println!("\nTracked containers:");
    let tracked = engine.tracked_containers();
    if tracked.is_empty() {
        println!("  (none)");
    }
    for (container, owner) in tracked {
        let place = match owner {
            ParentOwner::Inventory { inventory, index } => {
                format!("inventory {} [{}]", inventory.0, index)
            }
            ParentOwner::Slot(slot) => {
                format!("slot {}", ctx.sandbox.slot_key(slot).unwrap_or("?"))
            }
        };
        let mut counts: Vec<(i32, u32)> = engine
            .monitor()
            .snapshot(container)
            .map(|s| s.iter().map(|(t, c)| (*t, *c)).collect())
            .unwrap_or_default();
        counts.sort();
        println!("  {:<6} {:<24} {:?}", container.0, place, counts);
    }

    println!("\nEngine buffs:");
    for id in engine.active_buffs() {
        let state = match engine.buff_state(id) {
            Some(BuffState::Applied) => "applied",
            Some(BuffState::Suppressed) => "suppressed",
            None => "?",
        };
        println!("  {id:<6} {state}");
    }

    println!("\nPlayer buffs:");
    for buff in ctx.sandbox.active_buffs() {
        let lifetime = if buff.is_persistent_override() {
            "persistent".to_string()
        } else if buff.limited_lifetime {
            format!("{:.1}/{:.1}s", buff.current_lifetime, buff.total_lifetime)
        } else {
            "unlimited".to_string()
        };
        println!("  {:<6} {}", buff.id, lifetime);
    }

    let pending = engine.pending_actions();
    if !pending.is_empty() {
        println!("\nPending: {pending:?}");
    }
    println!("Subscriptions: {}", ctx.sandbox.subscription_count());
}

pub fn exit(ctx: &mut CliContext) {
    ctx.engine.shutdown(&mut ctx.sandbox);
    write!(std::io::stdout(), "quitting...").ok();
    std::io::stdout().flush().ok();
}

fn player_inventory(ctx: &CliContext) -> Result<InventoryId, String> {
    ctx.sandbox
        .player_inventory()
        .ok_or_else(|| "no player, run `area` first".to_string())
}

fn named_slot(ctx: &CliContext, name: &str) -> Result<SlotId, String> {
    let slots = ctx
        .sandbox
        .player_slots()
        .ok_or("player slots not loaded")?;
    slots
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, slot)| *slot)
        .ok_or_else(|| format!("no slot named {name}"))
}
