//! Timed status effects granted by power-ups.
//!
//! An effect is either absent or active with an expiry instant, so a flag can
//! never carry a stale timestamp. Only [`ActiveEffects::expire`] clears an
//! effect; gameplay code reads them but never removes them.

use arena_shared::PowerUpKind;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveEffects {
    speed_boost: Option<Instant>,
    invincible: Option<Instant>,
    double_power: Option<Instant>,
}

impl ActiveEffects {
    fn slot_mut(&mut self, kind: PowerUpKind) -> &mut Option<Instant> {
        match kind {
            PowerUpKind::SpeedBoost => &mut self.speed_boost,
            PowerUpKind::Invincibility => &mut self.invincible,
            PowerUpKind::DoublePower => &mut self.double_power,
        }
    }

    fn slot(&self, kind: PowerUpKind) -> Option<Instant> {
        match kind {
            PowerUpKind::SpeedBoost => self.speed_boost,
            PowerUpKind::Invincibility => self.invincible,
            PowerUpKind::DoublePower => self.double_power,
        }
    }

    /// Activates `kind` until `now + duration`. Re-granting an active effect
    /// restarts its timer.
    pub fn grant(&mut self, kind: PowerUpKind, now: Instant, duration: Duration) {
        *self.slot_mut(kind) = Some(now + duration);
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Clears every effect whose expiry is at or before `now` and returns the cleared kinds.
    pub fn expire(&mut self, now: Instant) -> Vec<PowerUpKind> {
        let mut cleared = Vec::new();
        for kind in PowerUpKind::ALL {
            let slot = self.slot_mut(kind);
            if matches!(*slot, Some(deadline) if deadline <= now) {
                *slot = None;
                cleared.push(kind);
            }
        }
        cleared
    }
}
