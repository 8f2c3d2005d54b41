//! Authoritative world state.
//!
//! `World` exclusively owns every player, power-up, NPC and duel. All
//! mutation goes through `&mut self` methods, so whoever owns the `World`
//! is the single exclusion boundary: the server's event loop holds it and
//! processes one operation at a time. Each operation validates first and
//! mutates second, so a returned error means nothing changed.

use crate::config::ServerConfig;
use crate::duel::{ActiveDuel, DuelResolution};
use crate::entity::Player;
use crate::error::WorldError;
use crate::effects::ActiveEffects;
use arena_shared::{
    collides, Npc, PlayerState, PowerUp, PowerUpKind, RoundEndReason, RoundResult, RoundState,
    Vector2, WorldSnapshot, MIN_LEVEL,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Instant;

/// Connection-scoped identity; a player's id is the id of its connection.
pub type PlayerId = String;

/// Side effects of a move, reported for logging and client feedback.
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    PowerUpCollected { power_up_id: u64, kind: PowerUpKind },
    NpcEaten { npc_id: u64, size: u32, level: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttackOutcome {
    DuelStarted { difficulty: f64 },
    DefenderInvincible,
    SelfTarget,
    /// The players are farther apart than the attack radius.
    OutOfRange,
    /// Either participant is already in a duel.
    AlreadyDueling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DuelOutcome {
    NoActiveDuel,
    InProgress { progress: f64 },
    Concluded {
        winner: PlayerId,
        loser: PlayerId,
        attacker_won: bool,
    },
}

pub struct World {
    config: ServerConfig,
    players: HashMap<PlayerId, Player>,
    power_ups: Vec<PowerUp>,
    npcs: Vec<Npc>,
    /// Keyed by attacker id.
    duels: HashMap<PlayerId, ActiveDuel>,
    next_entity_id: u64,
    rng: StdRng,

    round: u32,
    round_started: Instant,
    /// Refreshed on every round check so snapshots stay a pure read.
    round_seconds_left: u64,
    last_round: Option<RoundResult>,
}

impl World {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic world for tests and replays.
    pub fn with_seed(config: ServerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ServerConfig, rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            power_ups: Vec::new(),
            npcs: Vec::new(),
            duels: HashMap::new(),
            next_entity_id: 1,
            rng,
            round: 1,
            round_started: Instant::now(),
            round_seconds_left: config.round.duration.as_secs(),
            last_round: None,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn power_up_count(&self) -> usize {
        self.power_ups.len()
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    /// The duel `player_id` takes part in, as attacker or defender.
    pub fn duel_for(&self, player_id: &str) -> Option<&ActiveDuel> {
        self.duels
            .get(player_id)
            .or_else(|| self.duels.values().find(|d| d.involves(player_id)))
    }

    pub fn add_player(&mut self, id: &str, name: &str) -> Result<PlayerState, WorldError> {
        if self.players.contains_key(id) {
            return Err(WorldError::DuplicateConnection(id.to_string()));
        }

        let position = self.config.arena.random_position(&mut self.rng);
        let player = Player::new(id.to_string(), name.to_string(), position);
        let view = player.view();

        info!(
            "Added player {} ({}) at ({:.1}, {:.1})",
            name, id, position.x, position.y
        );
        self.players.insert(id.to_string(), player);
        Ok(view)
    }

    /// Removes the player and every duel that references it. Unknown ids are a no-op.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let removed = self.players.remove(id);
        self.duels.retain(|_, duel| !duel.involves(id));

        match removed {
            Some(player) => {
                info!("Removed player {} ({})", player.name, id);
                true
            }
            None => false,
        }
    }

    /// Teleports the player to `(x, y)` (clamped to the arena) and consumes
    /// every power-up and NPC it now overlaps.
    pub fn move_player(
        &mut self,
        id: &str,
        x: f32,
        y: f32,
        now: Instant,
    ) -> Result<Vec<CollisionEvent>, WorldError> {
        let target = self.config.arena.clamp(Vector2::new(x, y));
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownPlayer(id.to_string()))?;
        player.position = target;

        let power_up_radius = self.config.power_up_radius;
        let npc_radius = self.config.npc_radius;
        let mut collected = Vec::new();
        self.power_ups.retain(|p| {
            let hit = collides(target, p.position(), power_up_radius);
            if hit {
                collected.push(p.clone());
            }
            !hit
        });
        let mut eaten = Vec::new();
        self.npcs.retain(|n| {
            let hit = collides(target, n.position(), npc_radius);
            if hit {
                eaten.push(n.clone());
            }
            !hit
        });

        let mut events = Vec::with_capacity(collected.len() + eaten.len());
        for power_up in collected {
            player
                .effects
                .grant(power_up.kind, now, self.config.effect_duration);
            debug!("Player {} collected {:?}", id, power_up.kind);
            events.push(CollisionEvent::PowerUpCollected {
                power_up_id: power_up.id,
                kind: power_up.kind,
            });
        }
        for npc in eaten {
            player.raise_level(npc.size);
            debug!("Player {} ate NPC {} (+{})", id, npc.id, npc.size);
            events.push(CollisionEvent::NpcEaten {
                npc_id: npc.id,
                size: npc.size,
                level: player.level(),
            });
        }

        Ok(events)
    }

    /// Opens a duel with `attacker_id` pulling towards 1. Levels are untouched
    /// until the duel concludes.
    pub fn initiate_attack(
        &mut self,
        attacker_id: &str,
        defender_id: &str,
    ) -> Result<AttackOutcome, WorldError> {
        let attacker = self
            .players
            .get(attacker_id)
            .ok_or_else(|| WorldError::UnknownPlayer(attacker_id.to_string()))?;
        let defender = self
            .players
            .get(defender_id)
            .ok_or_else(|| WorldError::UnknownPlayer(defender_id.to_string()))?;

        if attacker_id == defender_id {
            return Ok(AttackOutcome::SelfTarget);
        }
        if defender.is_invincible() {
            return Ok(AttackOutcome::DefenderInvincible);
        }
        if !collides(attacker.position, defender.position, self.config.attack_radius) {
            return Ok(AttackOutcome::OutOfRange);
        }
        if self.duel_for(attacker_id).is_some() || self.duel_for(defender_id).is_some() {
            return Ok(AttackOutcome::AlreadyDueling);
        }

        let duel = ActiveDuel::new(
            attacker_id.to_string(),
            defender_id.to_string(),
            attacker.level(),
            defender.level(),
        );
        let difficulty = duel.difficulty();
        info!(
            "Duel started: {} vs {} (difficulty {:.2})",
            attacker.name, defender.name, difficulty
        );
        self.duels.insert(attacker_id.to_string(), duel);

        Ok(AttackOutcome::DuelStarted { difficulty })
    }

    /// Advances the duel `player_id` takes part in. DoublePower doubles the pull.
    pub fn submit_duel_input(&mut self, player_id: &str) -> Result<DuelOutcome, WorldError> {
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| WorldError::UnknownPlayer(player_id.to_string()))?;
        let multiplier = if player.has_double_power() { 2.0 } else { 1.0 };
        let step = self.config.duel_step * multiplier;

        let key = match self.duels.iter().find(|(_, d)| d.involves(player_id)) {
            Some((key, _)) => key.clone(),
            None => return Ok(DuelOutcome::NoActiveDuel),
        };
        let Some(duel) = self.duels.get_mut(&key) else {
            return Ok(DuelOutcome::NoActiveDuel);
        };
        let Some(side) = duel.side_of(player_id) else {
            return Ok(DuelOutcome::NoActiveDuel);
        };

        let (winner, loser, attacker_won, reward) = match duel.push(side, step) {
            DuelResolution::Continuing { progress } => {
                return Ok(DuelOutcome::InProgress { progress });
            }
            DuelResolution::AttackerWon => (
                duel.attacker.clone(),
                duel.defender.clone(),
                true,
                self.config.attacker_win_reward,
            ),
            DuelResolution::DefenderWon => (
                duel.defender.clone(),
                duel.attacker.clone(),
                false,
                self.config.defender_win_reward,
            ),
        };

        self.duels.remove(&key);
        if let Some(player) = self.players.get_mut(&winner) {
            player.raise_level(reward);
            info!(
                "Duel concluded: {} beat {} and reached level {}",
                player.name,
                loser,
                player.level()
            );
        }

        Ok(DuelOutcome::Concluded {
            winner,
            loser,
            attacker_won,
        })
    }

    /// Places a random power-up unless the cap is reached.
    pub fn spawn_power_up(&mut self) -> Option<PowerUp> {
        if self.power_ups.len() >= self.config.power_ups.cap {
            return None;
        }
        let position = self.config.arena.random_position(&mut self.rng);
        let kind = PowerUpKind::ALL[self.rng.gen_range(0..PowerUpKind::ALL.len())];
        Some(self.insert_power_up(kind, position))
    }

    /// Places an NPC of random size unless the cap is reached.
    pub fn spawn_npc(&mut self) -> Option<Npc> {
        if self.npcs.len() >= self.config.npcs.cap {
            return None;
        }
        let position = self.config.arena.random_position(&mut self.rng);
        let size = self.rng.gen_range(1..=self.config.npc_max_size.max(1));
        Some(self.insert_npc(size, position))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    fn insert_power_up(&mut self, kind: PowerUpKind, position: Vector2) -> PowerUp {
        let power_up = PowerUp {
            id: self.next_id(),
            x: position.x,
            y: position.y,
            kind,
        };
        debug!("Spawned {:?} at ({:.1}, {:.1})", kind, position.x, position.y);
        self.power_ups.push(power_up.clone());
        power_up
    }

    fn insert_npc(&mut self, size: u32, position: Vector2) -> Npc {
        let npc = Npc {
            id: self.next_id(),
            x: position.x,
            y: position.y,
            size,
        };
        debug!("Spawned NPC size {} at ({:.1}, {:.1})", size, position.x, position.y);
        self.npcs.push(npc.clone());
        npc
    }

    /// Clears elapsed effects on every player. Returns what was cleared.
    pub fn expire_effects(&mut self, now: Instant) -> Vec<(PlayerId, PowerUpKind)> {
        let mut cleared = Vec::new();
        for (id, player) in self.players.iter_mut() {
            for kind in player.effects.expire(now) {
                debug!("Effect {:?} expired for {}", kind, id);
                cleared.push((id.clone(), kind));
            }
        }
        cleared
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Ends the current round once a player has reached the winning level or
    /// the round clock has run out, then starts the next one: every level
    /// drops back to the minimum and duels and effects are cleared.
    /// Power-ups and NPCs stay where they are.
    pub fn advance_round(&mut self, now: Instant) -> Option<RoundResult> {
        let deadline = self.round_started + self.config.round.duration;
        self.round_seconds_left = deadline.saturating_duration_since(now).as_secs();

        let win_level = self.config.round.win_level;
        // Highest level wins; ties go to the smallest id so the outcome is stable.
        let leader = self
            .players
            .values()
            .filter(|p| p.level() >= win_level)
            .max_by(|a, b| a.level().cmp(&b.level()).then_with(|| b.id.cmp(&a.id)));

        let result = match leader {
            Some(winner) => RoundResult {
                round: self.round,
                winner_id: Some(winner.id.clone()),
                winner_name: Some(winner.name.clone()),
                reason: RoundEndReason::LevelReached,
            },
            None if now >= deadline => RoundResult {
                round: self.round,
                winner_id: None,
                winner_name: None,
                reason: RoundEndReason::TimeUp,
            },
            None => return None,
        };

        match &result.winner_name {
            Some(name) => info!("Round {} won by {}", result.round, name),
            None => info!("Round {} ended: time is up", result.round),
        }

        for player in self.players.values_mut() {
            player.set_level(MIN_LEVEL);
            player.effects = ActiveEffects::default();
        }
        self.duels.clear();
        self.round += 1;
        self.round_started = now;
        self.round_seconds_left = self.config.round.duration.as_secs();
        self.last_round = Some(result.clone());

        Some(result)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self
                .players
                .iter()
                .map(|(id, player)| (id.clone(), player.view()))
                .collect(),
            power_ups: self.power_ups.clone(),
            npcs: self.npcs.clone(),
            duels: self.duels.values().map(ActiveDuel::view).collect(),
            round: RoundState {
                number: self.round,
                seconds_left: self.round_seconds_left,
                last_result: self.last_round.clone(),
            },
        }
    }
}
