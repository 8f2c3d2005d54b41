//! Wire protocol and pure geometry shared by the arena server and its clients.
//!
//! Clients send small JSON commands tagged by an `action` field; the server
//! answers every state change with a full [`WorldSnapshot`]. Field names of
//! the snapshot are PascalCase because that is what the browser client reads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ARENA_WIDTH: f32 = 1600.0;
pub const ARENA_HEIGHT: f32 = 900.0;
pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 100;
pub const POWER_UP_PICKUP_RADIUS: f32 = 30.0;
pub const NPC_PICKUP_RADIUS: f32 = 40.0;
pub const ATTACK_RANGE: f32 = 50.0;
pub const MAX_NAME_CHARS: usize = 20;

///Represents a point in the arena plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    ///Returns the Euclidean distance between two points.
    pub fn distance(&self, other: &Vector2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Two points collide iff their distance is strictly below `threshold`.
pub fn collides(a: Vector2, b: Vector2, threshold: f32) -> bool {
    a.distance(&b) < threshold
}

/// Commands a client may send. Anything outside this set fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        name: String,
    },
    Move {
        x: f32,
        y: f32,
    },
    Attack {
        #[serde(rename = "targetId")]
        target_id: String,
    },
    MiniGameInput {
        #[serde(rename = "playerId")]
        player_id: String,
    },
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    SpeedBoost,
    Invincibility,
    DoublePower,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::Invincibility,
        PowerUpKind::DoublePower,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub level: u32,
    pub is_invincible: bool,
    pub has_speed_boost: bool,
    pub has_double_power: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerUp {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "Type")]
    pub kind: PowerUpKind,
}

impl PowerUp {
    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Npc {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub size: u32,
}

impl Npc {
    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

/// The only duel data clients get to see: who is pulling and where the bar is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DuelState {
    pub attacker_id: String,
    pub defender_id: String,
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEndReason {
    LevelReached,
    TimeUp,
}

/// Announcement of a finished round. A round that ran out of time has no winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoundResult {
    pub round: u32,
    pub winner_id: Option<String>,
    pub winner_name: Option<String>,
    pub reason: RoundEndReason,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoundState {
    pub number: u32,
    pub seconds_left: u64,
    pub last_result: Option<RoundResult>,
}

/// Full-state replace pushed to every connection after each change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorldSnapshot {
    pub players: BTreeMap<String, PlayerState>,
    pub power_ups: Vec<PowerUp>,
    #[serde(rename = "NPCs")]
    pub npcs: Vec<Npc>,
    pub duels: Vec<DuelState>,
    pub round: RoundState,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Finds a player by display name. Names are not unique; first match wins.
    pub fn player_named(&self, name: &str) -> Option<&PlayerState> {
        self.players.values().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_distance() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(3.0, 4.0);
        assert_approx_eq!(a.distance(&b), 5.0, 0.0001);
        assert_approx_eq!(b.distance(&a), 5.0, 0.0001);
    }

    #[test]
    fn test_collision_inside_threshold() {
        let player = Vector2::new(100.0, 100.0);
        let pickup = Vector2::new(105.0, 100.0);
        assert!(collides(player, pickup, POWER_UP_PICKUP_RADIUS));
    }

    #[test]
    fn test_collision_exact_threshold_is_not_overlap() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(30.0, 0.0);
        assert!(!collides(a, b, 30.0));
        assert!(collides(a, b, 30.5));
    }

    #[test]
    fn test_collision_same_point() {
        let a = Vector2::new(42.0, 42.0);
        assert!(collides(a, a, NPC_PICKUP_RADIUS));
        assert!(!collides(a, a, 0.0));
    }

    #[test]
    fn test_decode_join() {
        let msg = ClientMessage::decode(r#"{"action":"join","name":"Rex"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                name: "Rex".to_string()
            }
        );
    }

    #[test]
    fn test_decode_move_accepts_integers() {
        let msg = ClientMessage::decode(r#"{"action":"move","x":100,"y":250.5}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { x: 100.0, y: 250.5 });
    }

    #[test]
    fn test_decode_attack_and_duel_input() {
        let attack = ClientMessage::decode(r#"{"action":"attack","targetId":"abc"}"#).unwrap();
        assert_eq!(
            attack,
            ClientMessage::Attack {
                target_id: "abc".to_string()
            }
        );

        let input =
            ClientMessage::decode(r#"{"action":"miniGameInput","playerId":"me"}"#).unwrap();
        assert_eq!(
            input,
            ClientMessage::MiniGameInput {
                player_id: "me".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        assert!(ClientMessage::decode(r#"{"action":"teleport","x":1,"y":2}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_or_mistyped_fields() {
        let bad = [
            r#"{"action":"move","x":1}"#,
            r#"{"action":"move","x":"1","y":2}"#,
            r#"{"action":"join"}"#,
            r#"{"name":"Rex"}"#,
            r#"{"action":"attack","target":"abc"}"#,
            "not json",
            "",
        ];
        for text in bad {
            assert!(ClientMessage::decode(text).is_err(), "accepted: {}", text);
        }
    }

    #[test]
    fn test_encoded_message_uses_wire_names() {
        let text = ClientMessage::MiniGameInput {
            player_id: "p1".to_string(),
        }
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["action"], "miniGameInput");
        assert_eq!(value["playerId"], "p1");
    }

    #[test]
    fn test_snapshot_field_names() {
        let mut snapshot = WorldSnapshot::default();
        snapshot.players.insert(
            "p1".to_string(),
            PlayerState {
                id: "p1".to_string(),
                name: "Rex".to_string(),
                x: 10.0,
                y: 20.0,
                level: 3,
                is_invincible: true,
                has_speed_boost: false,
                has_double_power: false,
            },
        );
        snapshot.power_ups.push(PowerUp {
            id: 1,
            x: 5.0,
            y: 6.0,
            kind: PowerUpKind::DoublePower,
        });
        snapshot.npcs.push(Npc {
            id: 2,
            x: 7.0,
            y: 8.0,
            size: 2,
        });

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["Players"]["p1"]["Name"], "Rex");
        assert_eq!(value["Players"]["p1"]["Level"], 3);
        assert_eq!(value["Players"]["p1"]["IsInvincible"], true);
        assert_eq!(value["PowerUps"][0]["Type"], "DoublePower");
        assert_eq!(value["NPCs"][0]["Size"], 2);
        assert!(value["Duels"].as_array().unwrap().is_empty());
        assert!(value["Round"]["LastResult"].is_null());
    }

    #[test]
    fn test_round_result_wire_names() {
        let snapshot = WorldSnapshot {
            round: RoundState {
                number: 2,
                seconds_left: 300,
                last_result: Some(RoundResult {
                    round: 1,
                    winner_id: Some("p1".to_string()),
                    winner_name: Some("Rex".to_string()),
                    reason: RoundEndReason::LevelReached,
                }),
            },
            ..WorldSnapshot::default()
        };

        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["Round"]["Number"], 2);
        assert_eq!(value["Round"]["SecondsLeft"], 300);
        assert_eq!(value["Round"]["LastResult"]["WinnerName"], "Rex");
        assert_eq!(value["Round"]["LastResult"]["Reason"], "LevelReached");
        assert_eq!(WorldSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap(), snapshot);
    }

    #[test]
    fn test_player_named() {
        let mut snapshot = WorldSnapshot::default();
        assert!(snapshot.player_named("Rex").is_none());
        snapshot.players.insert(
            "p1".to_string(),
            PlayerState {
                id: "p1".to_string(),
                name: "Rex".to_string(),
                x: 0.0,
                y: 0.0,
                level: 1,
                is_invincible: false,
                has_speed_boost: false,
                has_double_power: false,
            },
        );
        assert_eq!(snapshot.player_named("Rex").unwrap().id, "p1");
    }
}
