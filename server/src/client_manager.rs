//! Connection registry and snapshot fan-out.
//!
//! Every open websocket registers an outbound queue here. Broadcasting
//! serializes the snapshot once and enqueues the same frame for each
//! recipient without awaiting, so a slow or dead peer only loses its own copy.

use crate::error::TransportError;
use crate::world::PlayerId;
use arena_shared::WorldSnapshot;
use log::{info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Message;

/// An open connection and the queue its writer task drains.
#[derive(Debug)]
pub struct Client {
    pub id: PlayerId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    sender: mpsc::Sender<Message>,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Enqueues a frame without waiting for room.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.sender.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::QueueFull(self.id.clone()),
            TrySendError::Closed(_) => TransportError::Closed(self.id.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct ClientManager {
    clients: HashMap<PlayerId, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a connection. Returns false if the server is full or the id is taken.
    pub fn add_client(&mut self, client: Client) -> bool {
        if self.clients.len() >= self.max_clients {
            warn!("Refusing {} from {}: server full", client.id, client.addr);
            return false;
        }
        if self.clients.contains_key(&client.id) {
            return false;
        }

        info!("Client {} connected from {}", client.id, client.addr);
        self.clients.insert(client.id.clone(), client);
        true
    }

    /// Drops the connection's queue, which ends its writer task.
    pub fn remove_client(&mut self, id: &str) -> bool {
        match self.clients.remove(id) {
            Some(client) => {
                info!(
                    "Client {} disconnected after {:.1}s",
                    client.id,
                    client.connected_at.elapsed().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Serializes `snapshot` once and offers it to every connection.
    pub fn broadcast(&self, snapshot: &WorldSnapshot) -> Result<BroadcastReport, serde_json::Error> {
        let mut report = BroadcastReport::default();
        if self.clients.is_empty() {
            return Ok(report);
        }

        let frame = Message::text(snapshot.to_json()?);
        for client in self.clients.values() {
            match client.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!("Snapshot not delivered: {}", err);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::{Npc, WorldSnapshot};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn client(id: &str, capacity: usize) -> (Client, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Client::new(id.to_string(), test_addr(), tx), rx)
    }

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            npcs: vec![Npc {
                id: 1,
                x: 1.0,
                y: 2.0,
                size: 3,
            }],
            ..WorldSnapshot::default()
        }
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_and_remove_client() {
        let mut manager = ClientManager::new(2);
        let (c, _rx) = client("a", 4);

        assert!(manager.add_client(c));
        assert!(manager.contains("a"));
        assert_eq!(manager.len(), 1);

        assert!(manager.remove_client("a"));
        assert!(!manager.remove_client("a"));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);
        let (a, _rx_a) = client("a", 4);
        let (b, _rx_b) = client("b", 4);

        assert!(manager.add_client(a));
        assert!(!manager.add_client(b));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_duplicate_id_is_refused() {
        let mut manager = ClientManager::new(4);
        let (a, _rx_a) = client("a", 4);
        let (again, _rx_again) = client("a", 4);

        assert!(manager.add_client(a));
        assert!(!manager.add_client(again));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_broadcast_with_no_clients() {
        let manager = ClientManager::new(4);
        assert_eq!(
            manager.broadcast(&snapshot()).unwrap(),
            BroadcastReport::default()
        );
    }

    #[tokio::test]
    async fn test_broadcast_delivers_same_frame_to_everyone() {
        let mut manager = ClientManager::new(4);
        let (a, mut rx_a) = client("a", 4);
        let (b, mut rx_b) = client("b", 4);
        manager.add_client(a);
        manager.add_client(b);

        let report = manager.broadcast(&snapshot()).unwrap();
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });

        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);
        let decoded = WorldSnapshot::from_json(frame_a.to_text().unwrap()).unwrap();
        assert_eq!(decoded, snapshot());
    }

    #[tokio::test]
    async fn test_failing_recipients_do_not_block_others() {
        let mut manager = ClientManager::new(4);
        let (closed, closed_rx) = client("closed", 4);
        drop(closed_rx);
        let (full, _full_rx) = client("full", 1);
        full.send(Message::text("backlog")).unwrap();
        let (healthy, mut healthy_rx) = client("healthy", 4);

        manager.add_client(closed);
        manager.add_client(full);
        manager.add_client(healthy);

        let report = manager.broadcast(&snapshot()).unwrap();
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 2 });
        assert!(healthy_rx.recv().await.unwrap().is_text());
    }

    #[test]
    fn test_send_error_kinds() {
        let (full, _rx) = client("full", 1);
        full.send(Message::text("one")).unwrap();
        assert!(matches!(
            full.send(Message::text("two")),
            Err(TransportError::QueueFull(id)) if id == "full"
        ));

        let (closed, rx) = client("closed", 1);
        drop(rx);
        assert!(matches!(
            closed.send(Message::text("one")),
            Err(TransportError::Closed(_))
        ));
    }
}
