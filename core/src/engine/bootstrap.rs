//! Bounded polling for late-loading sources
//!
//! After an area loads the player, its pet and its named slots appear over
//! several ticks. The engine waits for the player (up to `PLAYER_WAIT_TICKS`),
//! scans, then keeps polling for whatever was still missing.

use crate::host::World;

pub const PLAYER_WAIT_TICKS: u32 = 600;
pub const PET_WAIT_TICKS: u32 = 300;
pub const SLOT_WAIT_TICKS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolledSource {
    Player,
    Pet,
    Slots,
}

impl PolledSource {
    fn is_available(self, world: &impl World) -> bool {
        match self {
            PolledSource::Player => world.player_inventory().is_some(),
            PolledSource::Pet => world.pet_inventory().is_some(),
            PolledSource::Slots => world.player_slots().is_some(),
        }
    }

    fn limit(self) -> u32 {
        match self {
            PolledSource::Player => PLAYER_WAIT_TICKS,
            PolledSource::Pet => PET_WAIT_TICKS,
            PolledSource::Slots => SLOT_WAIT_TICKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapEvent {
    /// Player is present; run the initial full scan
    PlayerReady,
    /// A later source appeared; rescan
    SourceReady(PolledSource),
    /// Gave up waiting
    Expired(PolledSource),
}

#[derive(Debug, Clone, Copy)]
struct SourcePoll {
    source: PolledSource,
    waited: u32,
}

#[derive(Debug)]
enum Phase {
    WaitingForPlayer { waited: u32 },
    Polling(Vec<SourcePoll>),
    Finished,
}

#[derive(Debug)]
pub struct Bootstrap {
    phase: Phase,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self {
            phase: Phase::WaitingForPlayer { waited: 0 },
        }
    }

    /// Advance one tick
    pub fn poll(&mut self, world: &impl World) -> Vec<BootstrapEvent> {
        let mut events = Vec::new();
        match &mut self.phase {
            Phase::WaitingForPlayer { waited } => {
                if PolledSource::Player.is_available(world) {
                    events.push(BootstrapEvent::PlayerReady);
                    let missing: Vec<SourcePoll> = [PolledSource::Pet, PolledSource::Slots]
                        .into_iter()
                        .filter(|source| !source.is_available(world))
                        .map(|source| SourcePoll { source, waited: 0 })
                        .collect();
                    self.phase = if missing.is_empty() {
                        Phase::Finished
                    } else {
                        Phase::Polling(missing)
                    };
                } else {
                    *waited += 1;
                    if *waited >= PolledSource::Player.limit() {
                        events.push(BootstrapEvent::Expired(PolledSource::Player));
                        self.phase = Phase::Finished;
                    }
                }
            }
            Phase::Polling(polls) => {
                polls.retain_mut(|poll| {
                    if poll.source.is_available(world) {
                        events.push(BootstrapEvent::SourceReady(poll.source));
                        return false;
                    }
                    poll.waited += 1;
                    if poll.waited >= poll.source.limit() {
                        events.push(BootstrapEvent::Expired(poll.source));
                        return false;
                    }
                    true
                });
                if polls.is_empty() {
                    self.phase = Phase::Finished;
                }
            }
            Phase::Finished => {}
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Sandbox;

    fn run(bootstrap: &mut Bootstrap, world: &Sandbox, ticks: u32) -> Vec<BootstrapEvent> {
        (0..ticks).flat_map(|_| bootstrap.poll(world)).collect()
    }

    #[test]
    fn test_player_wait_expires_at_cap() {
        let world = Sandbox::new();
        let mut bootstrap = Bootstrap::new();

        assert!(run(&mut bootstrap, &world, PLAYER_WAIT_TICKS - 1).is_empty());
        assert_eq!(
            bootstrap.poll(&world),
            vec![BootstrapEvent::Expired(PolledSource::Player)]
        );
        assert!(bootstrap.is_finished());
    }

    #[test]
    fn test_fully_loaded_player_finishes_immediately() {
        let mut world = Sandbox::new();
        world.spawn_player(4);
        world.spawn_pet(4);
        world.load_player_slots(&["Medic"]).unwrap();

        let mut bootstrap = Bootstrap::new();
        assert_eq!(bootstrap.poll(&world), vec![BootstrapEvent::PlayerReady]);
        assert!(bootstrap.is_finished());
    }

    #[test]
    fn test_late_sources_are_polled_independently() {
        let mut world = Sandbox::new();
        world.spawn_player(4);
        let mut bootstrap = Bootstrap::new();
        assert_eq!(bootstrap.poll(&world), vec![BootstrapEvent::PlayerReady]);

        assert!(run(&mut bootstrap, &world, 10).is_empty());
        world.load_player_slots(&["Medic"]).unwrap();
        assert_eq!(
            bootstrap.poll(&world),
            vec![BootstrapEvent::SourceReady(PolledSource::Slots)]
        );

        // Pet never shows up
        let events = run(&mut bootstrap, &world, PET_WAIT_TICKS);
        assert_eq!(events, vec![BootstrapEvent::Expired(PolledSource::Pet)]);
        assert!(bootstrap.is_finished());
    }
}
