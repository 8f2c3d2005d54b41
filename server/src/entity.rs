use crate::effects::ActiveEffects;
use arena_shared::{PlayerState, PowerUpKind, Vector2, MAX_LEVEL, MIN_LEVEL};

// Server-side player record; `view` projects it onto the wire type
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Vector2,
    level: u32,
    pub effects: ActiveEffects,
}

impl Player {
    pub fn new(id: String, name: String, position: Vector2) -> Self {
        Player {
            id,
            name,
            position,
            level: MIN_LEVEL,
            effects: ActiveEffects::default(),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    // Levels always stay within [MIN_LEVEL, MAX_LEVEL]
    pub fn set_level(&mut self, level: u32) {
        self.level = level.clamp(MIN_LEVEL, MAX_LEVEL);
    }

    pub fn raise_level(&mut self, amount: u32) {
        self.set_level(self.level.saturating_add(amount));
    }

    pub fn is_invincible(&self) -> bool {
        self.effects.is_active(PowerUpKind::Invincibility)
    }

    pub fn has_double_power(&self) -> bool {
        self.effects.is_active(PowerUpKind::DoublePower)
    }

    pub fn view(&self) -> PlayerState {
        PlayerState {
            id: self.id.clone(),
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            level: self.level,
            is_invincible: self.is_invincible(),
            has_speed_boost: self.effects.is_active(PowerUpKind::SpeedBoost),
            has_double_power: self.has_double_power(),
        }
    }
}
