//! Server tuning knobs. The binary fills these from the command line; tests
//! build them directly with struct-update syntax over `Default`.

use crate::error::ConfigError;
use arena_shared::{
    Vector2, ARENA_HEIGHT, ARENA_WIDTH, ATTACK_RANGE, MIN_LEVEL, NPC_PICKUP_RADIUS,
    POWER_UP_PICKUP_RADIUS,
};
use rand::Rng;
use std::time::Duration;

/// Rectangular playing field anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }
}

impl Arena {
    pub fn contains(&self, point: Vector2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    pub fn clamp(&self, point: Vector2) -> Vector2 {
        Vector2 {
            x: point.x.clamp(0.0, self.width),
            y: point.y.clamp(0.0, self.height),
        }
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector2 {
        Vector2 {
            x: rng.gen_range(0.0..=self.width),
            y: rng.gen_range(0.0..=self.height),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpawnConfig {
    pub interval: Duration,
    pub cap: usize,
}

/// A round ends when a player reaches `win_level` or `duration` runs out.
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    pub duration: Duration,
    pub win_level: u32,
    /// How often the round clock and win condition are checked.
    pub check_interval: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(300),
            win_level: 10,
            check_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub arena: Arena,
    pub max_clients: usize,
    pub power_ups: SpawnConfig,
    pub npcs: SpawnConfig,
    pub npc_max_size: u32,
    pub power_up_radius: f32,
    pub npc_radius: f32,
    /// Players farther apart than this cannot start a duel.
    pub attack_radius: f32,
    pub effect_duration: Duration,
    pub effect_sweep_interval: Duration,
    pub duel_step: f64,
    pub attacker_win_reward: u32,
    pub defender_win_reward: u32,
    pub round: RoundConfig,
    /// Upper bound on a single websocket write before the peer is dropped.
    pub write_timeout: Duration,
    /// Frames buffered per connection before new snapshots are dropped for it.
    pub outbound_queue: usize,
    /// Events buffered from all connections before readers wait for the server loop.
    pub event_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            max_clients: 64,
            power_ups: SpawnConfig {
                interval: Duration::from_millis(5000),
                cap: 5,
            },
            npcs: SpawnConfig {
                interval: Duration::from_millis(4000),
                cap: 10,
            },
            npc_max_size: 3,
            power_up_radius: POWER_UP_PICKUP_RADIUS,
            npc_radius: NPC_PICKUP_RADIUS,
            attack_radius: ATTACK_RANGE,
            effect_duration: Duration::from_secs(10),
            effect_sweep_interval: Duration::from_millis(100),
            duel_step: 0.1,
            attacker_win_reward: 2,
            defender_win_reward: 1,
            round: RoundConfig::default(),
            write_timeout: Duration::from_millis(2000),
            outbound_queue: 32,
            event_queue: 1024,
        }
    }
}

impl ServerConfig {
    /// Rejects settings that would make arena geometry or queues meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Arena { width, height } = self.arena;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidArena { width, height });
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Zero("max clients"));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Zero("outbound queue"));
        }
        if self.event_queue == 0 {
            return Err(ConfigError::Zero("event queue"));
        }
        if self.round.win_level <= MIN_LEVEL {
            return Err(ConfigError::WinLevelTooLow(self.round.win_level));
        }
        Ok(())
    }
}
