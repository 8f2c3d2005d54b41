use arena_shared::{ClientMessage, WorldSnapshot, ARENA_HEIGHT, ARENA_WIDTH};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted websocket client for poking a running server by hand
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: String,
    /// Display name to join with
    #[clap(short, long, default_value = "TestClient")]
    name: String,
    /// Number of moves to send
    #[clap(short, long, default_value = "10")]
    moves: u32,
}

fn summarize(snapshot: &WorldSnapshot) {
    println!(
        "Snapshot: {} players, {} power-ups, {} NPCs, {} duels",
        snapshot.players.len(),
        snapshot.power_ups.len(),
        snapshot.npcs.len(),
        snapshot.duels.len()
    );
    for player in snapshot.players.values() {
        println!(
            "  {} ({}): level {} at ({:.0}, {:.0})",
            player.name, player.id, player.level, player.x, player.y
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let url = format!("ws://{}/ws", args.server);

    println!("Connecting to {}", url);
    let (ws, _) = connect_async(url.as_str()).await?;
    let (mut write, mut read) = ws.split();

    let join = ClientMessage::Join {
        name: args.name.clone(),
    };
    write.send(Message::text(join.encode()?)).await?;

    for i in 0..args.moves {
        // Walk a circle around the middle of the arena
        let angle = i as f32 / 5.0;
        let step = ClientMessage::Move {
            x: ARENA_WIDTH / 2.0 + angle.cos() * 200.0,
            y: ARENA_HEIGHT / 2.0 + angle.sin() * 200.0,
        };
        println!("Sending {:?}", step);
        write.send(Message::text(step.encode()?)).await?;

        match timeout(Duration::from_secs(1), read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match WorldSnapshot::from_json(&text) {
                Ok(snapshot) => summarize(&snapshot),
                Err(e) => println!("Failed to decode snapshot: {}", e),
            },
            Ok(Some(Ok(other))) => println!("Unexpected frame: {:?}", other),
            Ok(Some(Err(e))) => {
                println!("Connection error: {}", e);
                break;
            }
            Ok(None) => {
                println!("Server closed the connection");
                break;
            }
            Err(_) => println!("No snapshot within a second"),
        }

        sleep(Duration::from_millis(500)).await;
    }

    write.send(Message::Close(None)).await?;
    println!("Test client finished");
    Ok(())
}
