//! Periodic jobs: the two spawners, the effect-expiry sweep and the round clock.
//!
//! The scheduler owns only timers. It tells the event loop *which* job is due
//! and the loop runs it against the world, so timer-driven mutations queue up
//! behind client messages instead of racing them.

use crate::config::ServerConfig;
use crate::world::World;
use log::debug;
use std::time::{Duration, Instant};
use tokio::time::{interval_at, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    SpawnPowerUp,
    SpawnNpc,
    ExpireEffects,
    AdvanceRound,
}

pub struct Scheduler {
    power_ups: Interval,
    npcs: Interval,
    sweep: Interval,
    round: Interval,
}

/// First tick fires one period from now, not immediately.
fn periodic(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

impl Scheduler {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            power_ups: periodic(config.power_ups.interval),
            npcs: periodic(config.npcs.interval),
            sweep: periodic(config.effect_sweep_interval),
            round: periodic(config.round.check_interval),
        }
    }

    /// Waits for the next due job. Cancel-safe, so it can sit in a `select!`.
    pub async fn next(&mut self) -> Job {
        tokio::select! {
            _ = self.power_ups.tick() => Job::SpawnPowerUp,
            _ = self.npcs.tick() => Job::SpawnNpc,
            _ = self.sweep.tick() => Job::ExpireEffects,
            _ = self.round.tick() => Job::AdvanceRound,
        }
    }
}

/// Runs `job` against the world. Returns true if the world changed.
pub fn run_job(world: &mut World, job: Job, now: Instant) -> bool {
    match job {
        Job::SpawnPowerUp => world.spawn_power_up().is_some(),
        Job::SpawnNpc => world.spawn_npc().is_some(),
        Job::ExpireEffects => {
            let cleared = world.expire_effects(now);
            if !cleared.is_empty() {
                debug!("Sweep cleared {} effect(s)", cleared.len());
            }
            !cleared.is_empty()
        }
        Job::AdvanceRound => world.advance_round(now).is_some(),
    }
}
