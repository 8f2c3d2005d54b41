//! Maps a decoded client message onto a world operation.

use crate::error::{ProtocolError, RouteError};
use crate::world::{AttackOutcome, DuelOutcome, World};
use arena_shared::{ClientMessage, MAX_NAME_CHARS};
use log::{debug, info};
use std::time::Instant;

/// Decodes one text frame. Anything outside the closed action set is malformed.
pub fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(ClientMessage::decode(text)?)
}

/// Trims and truncates a display name; blank names are refused.
pub fn sanitize_name(name: &str) -> Result<String, ProtocolError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::MalformedMessage(
            "name must not be blank".to_string(),
        ));
    }
    Ok(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

/// Applies `message` from connection `sender`. Returns whether the world
/// changed and a snapshot should go out.
pub fn route(
    world: &mut World,
    sender: &str,
    message: ClientMessage,
    now: Instant,
) -> Result<bool, RouteError> {
    match message {
        ClientMessage::Join { name } => {
            let name = sanitize_name(&name)?;
            world.add_player(sender, &name)?;
            Ok(true)
        }
        ClientMessage::Move { x, y } => {
            if !x.is_finite() || !y.is_finite() {
                return Err(ProtocolError::MalformedMessage(
                    "coordinates must be finite".to_string(),
                )
                .into());
            }
            for event in world.move_player(sender, x, y, now)? {
                debug!("{} -> {:?}", sender, event);
            }
            Ok(true)
        }
        ClientMessage::Attack { target_id } => {
            let outcome = world.initiate_attack(sender, &target_id)?;
            match outcome {
                AttackOutcome::DuelStarted { .. } => Ok(true),
                refused => {
                    info!("Attack {} -> {} refused: {:?}", sender, target_id, refused);
                    Ok(false)
                }
            }
        }
        ClientMessage::MiniGameInput { player_id } => {
            if player_id != sender {
                return Err(ProtocolError::MalformedMessage(format!(
                    "duel input for {} sent by {}",
                    player_id, sender
                ))
                .into());
            }
            match world.submit_duel_input(sender)? {
                DuelOutcome::NoActiveDuel => Ok(false),
                DuelOutcome::InProgress { .. } | DuelOutcome::Concluded { .. } => Ok(true),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::WorldError;

    fn world() -> World {
        World::with_seed(ServerConfig::default(), 11)
    }

    fn join(world: &mut World, id: &str, name: &str) {
        let msg = ClientMessage::Join {
            name: name.to_string(),
        };
        assert!(route(world, id, msg, Instant::now()).unwrap());
    }

    fn move_to(world: &mut World, id: &str, x: f32, y: f32) {
        let msg = ClientMessage::Move { x, y };
        assert!(route(world, id, msg, Instant::now()).unwrap());
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        let err = decode(r#"{"action":"fly"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedMessage(_)));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Rex ").unwrap(), "Rex");
        assert_eq!(
            sanitize_name("abcdefghijklmnopqrstuvwxyz").unwrap(),
            "abcdefghijklmnopqrst"
        );
        assert!(sanitize_name("   ").is_err());
    }

    #[test]
    fn test_join_then_snapshot() {
        let mut w = world();
        join(&mut w, "c1", "Rex");

        let snapshot = w.snapshot();
        assert_eq!(snapshot.players.len(), 1);
        let rex = snapshot.player_named("Rex").unwrap();
        assert_eq!(rex.level, 1);
    }

    #[test]
    fn test_second_join_is_duplicate() {
        let mut w = world();
        join(&mut w, "c1", "Rex");
        let err = route(
            &mut w,
            "c1",
            ClientMessage::Join {
                name: "Again".to_string(),
            },
            Instant::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RouteError::World(WorldError::DuplicateConnection(_))
        ));
        assert_eq!(w.player("c1").unwrap().name, "Rex");
    }

    #[test]
    fn test_move_before_join_is_unknown_player() {
        let mut w = world();
        let err = route(
            &mut w,
            "c1",
            ClientMessage::Move { x: 1.0, y: 1.0 },
            Instant::now(),
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::World(WorldError::UnknownPlayer(_))));
    }

    #[test]
    fn test_move_rejects_non_finite_coordinates() {
        let mut w = world();
        join(&mut w, "c1", "Rex");
        let before = w.player("c1").unwrap().position;

        let err = route(
            &mut w,
            "c1",
            ClientMessage::Move {
                x: f32::NAN,
                y: 1.0,
            },
            Instant::now(),
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::Protocol(_)));
        assert_eq!(w.player("c1").unwrap().position, before);
    }

    #[test]
    fn test_attack_and_duel_through_router() {
        let mut w = world();
        join(&mut w, "a", "Attacker");
        join(&mut w, "d", "Defender");
        move_to(&mut w, "a", 200.0, 200.0);
        move_to(&mut w, "d", 220.0, 200.0);

        let changed = route(
            &mut w,
            "a",
            ClientMessage::Attack {
                target_id: "d".to_string(),
            },
            Instant::now(),
        )
        .unwrap();
        assert!(changed);
        assert!(w.duel_for("d").is_some());

        // equal levels: five pulls from the attacker
        for _ in 0..5 {
            let changed = route(
                &mut w,
                "a",
                ClientMessage::MiniGameInput {
                    player_id: "a".to_string(),
                },
                Instant::now(),
            )
            .unwrap();
            assert!(changed);
        }
        assert!(w.duel_for("a").is_none());
        assert_eq!(w.player("a").unwrap().level(), 3);
        assert_eq!(w.player("d").unwrap().level(), 1);
    }

    #[test]
    fn test_refused_attack_does_not_broadcast() {
        let mut w = world();
        join(&mut w, "a", "A");
        let changed = route(
            &mut w,
            "a",
            ClientMessage::Attack {
                target_id: "a".to_string(),
            },
            Instant::now(),
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_out_of_range_attack_does_not_broadcast() {
        let mut w = world();
        join(&mut w, "a", "A");
        join(&mut w, "d", "D");
        move_to(&mut w, "a", 0.0, 0.0);
        move_to(&mut w, "d", 1600.0, 900.0);

        let changed = route(
            &mut w,
            "a",
            ClientMessage::Attack {
                target_id: "d".to_string(),
            },
            Instant::now(),
        )
        .unwrap();
        assert!(!changed);
        assert!(w.duel_for("a").is_none());
    }

    #[test]
    fn test_duel_input_for_someone_else_is_rejected() {
        let mut w = world();
        join(&mut w, "a", "A");
        join(&mut w, "d", "D");
        move_to(&mut w, "a", 200.0, 200.0);
        move_to(&mut w, "d", 220.0, 200.0);
        w.initiate_attack("a", "d").unwrap();

        let err = route(
            &mut w,
            "d",
            ClientMessage::MiniGameInput {
                player_id: "a".to_string(),
            },
            Instant::now(),
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::Protocol(_)));
        assert_eq!(w.snapshot().duels[0].progress, 0.5);
    }

    #[test]
    fn test_duel_input_without_duel_is_quiet() {
        let mut w = world();
        join(&mut w, "a", "A");
        let changed = route(
            &mut w,
            "a",
            ClientMessage::MiniGameInput {
                player_id: "a".to_string(),
            },
            Instant::now(),
        )
        .unwrap();
        assert!(!changed);
    }
}
