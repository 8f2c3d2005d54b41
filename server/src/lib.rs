//! # Arena Server Library
//!
//! Authoritative server for a real-time multiplayer arena. Clients connect
//! over a websocket, join with a display name and then send movement, attack
//! and duel inputs. The server owns the only copy of the world and pushes a
//! full snapshot to every connection after each change.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! One task owns the [`world::World`]. Connection tasks and the
//! [`scheduler::Scheduler`] never touch it directly; they feed events into
//! the loop in [`network::Server::run`], which applies them one at a time.
//! No two mutations ever interleave.
//!
//! ### Timed Jobs
//! Power-up and NPC spawning plus effect expiry are periodic jobs. The
//! scheduler only decides which job is due; the loop runs it.
//!
//! ### Per-Connection Outbound Queues
//! Every connection has a bounded queue drained by its own writer task.
//! Broadcasting serializes the snapshot once and never waits on a slow
//! peer. A full queue drops that peer's copy, and a stalled write closes
//! that connection only.
//!
//! ## Module Organization
//!
//! - `config`: arena bounds, spawn rates, radii, timeouts
//! - `effects`: timed power-up effects on a player
//! - `entity`: the player record and its level rules
//! - `duel`: tug-of-war progress between two players
//! - `world`: the game state and every operation on it
//! - `scheduler`: spawn and expiry timers
//! - `router`: maps decoded client messages onto world operations
//! - `client_manager`: connection registry and snapshot fan-out
//! - `network`: websocket transport and connection lifecycle
//! - `error`: error types shared by the modules above
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use arena_server::config::ServerConfig;
//! use arena_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod duel;
pub mod effects;
pub mod entity;
pub mod error;
pub mod network;
pub mod router;
pub mod scheduler;
pub mod world;
