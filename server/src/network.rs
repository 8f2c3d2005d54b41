//! Server network layer handling websocket connections and the event loop

use crate::client_manager::{Client, ClientManager};
use crate::config::ServerConfig;
use crate::error::{ProtocolError, TransportError};
use crate::router;
use crate::scheduler::{run_job, Scheduler};
use crate::world::{PlayerId, World};
use arena_shared::ClientMessage;
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use uuid::Uuid;

/// The only path that accepts a websocket upgrade.
pub const WS_PATH: &str = "/ws";

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        id: PlayerId,
        addr: SocketAddr,
        sender: mpsc::Sender<Message>,
    },
    Inbound {
        id: PlayerId,
        message: ClientMessage,
    },
    Disconnected {
        id: PlayerId,
    },
    Shutdown,
}

/// Cloneable handle for stopping a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    events: mpsc::Sender<ServerEvent>,
}

impl ServerHandle {
    /// Queues a shutdown behind any events already waiting.
    pub async fn shutdown(&self) {
        if self.events.send(ServerEvent::Shutdown).await.is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Main server owning the world. Every mutation happens on the task running
/// [`Server::run`], one event at a time.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    world: World,
    clients: ClientManager,

    event_tx: mpsc::Sender<ServerEvent>,
    event_rx: mpsc::Receiver<ServerEvent>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (event_tx, event_rx) = mpsc::channel(config.event_queue.max(1));

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_clients),
            world: World::new(config.clone()),
            config,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            events: self.event_tx.clone(),
        }
    }

    /// Spawns task that accepts sockets and hands each to its own connection task
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let events = self.event_tx.clone();
        let write_timeout = self.config.write_timeout;
        let queue = self.config.outbound_queue;

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    accepted = listener.accept() => accepted,
                    // The server loop dropped its receiver; release the port.
                    _ = events.closed() => break,
                };
                match accepted {
                    Ok((stream, addr)) => {
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            events.clone(),
                            write_timeout,
                            queue,
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
            debug!("Acceptor stopped");
        });
    }

    /// Serializes the current world and queues it for every connection
    fn publish(&self) {
        match self.clients.broadcast(&self.world.snapshot()) {
            Ok(report) if report.failed > 0 => debug!(
                "Snapshot delivered to {}, failed for {}",
                report.delivered, report.failed
            ),
            Ok(_) => {}
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
    }

    /// Applies one event. Returns false once the server should stop.
    fn handle_event(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::Connected { id, addr, sender } => {
                // A refused client's queue is dropped here, which closes its socket.
                self.clients.add_client(Client::new(id, addr, sender));
            }
            ServerEvent::Inbound { id, message } => {
                if !self.clients.contains(&id) {
                    return true;
                }
                match router::route(&mut self.world, &id, message, Instant::now()) {
                    Ok(true) => self.publish(),
                    Ok(false) => {}
                    Err(e) => warn!("Ignoring message from {}: {}", id, e),
                }
            }
            ServerEvent::Disconnected { id } => {
                self.clients.remove_client(&id);
                if self.world.remove_player(&id) {
                    self.publish();
                }
            }
            ServerEvent::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Main server loop: connection events and scheduled jobs, strictly one at a time
    pub async fn run(mut self) -> Result<(), TransportError> {
        self.spawn_acceptor();
        let mut scheduler = Scheduler::new(&self.config);

        info!("Server started on ws://{}{}", self.local_addr, WS_PATH);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => {
                            if !self.handle_event(event) {
                                break;
                            }
                        }
                        None => break,
                    }
                },
                job = scheduler.next() => {
                    if run_job(&mut self.world, job, Instant::now()) {
                        self.publish();
                    }
                },
            }
        }

        Ok(())
    }
}

/// Refuses the upgrade on any path other than [`WS_PATH`].
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == WS_PATH {
        return Ok(response);
    }
    let mut refusal = ErrorResponse::new(Some(format!(
        "no websocket endpoint at {}",
        request.uri().path()
    )));
    *refusal.status_mut() = StatusCode::NOT_FOUND;
    Err(refusal)
}

async fn write_frame<S>(sink: &mut S, message: Message, limit: Duration) -> Result<(), TransportError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match timeout(limit, sink.send(message)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(TransportError::Timeout),
    }
}

/// Runs one websocket connection until either side gives up
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<ServerEvent>,
    write_timeout: Duration,
    queue: usize,
) {
    let ws = match accept_hdr_async(stream, check_path).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let id = Uuid::new_v4().to_string();
    let (sender, mut outbound) = mpsc::channel::<Message>(queue.max(1));
    if events
        .send(ServerEvent::Connected {
            id: id.clone(),
            addr,
            sender,
        })
        .await
        .is_err()
    {
        return;
    }

    let (mut write, mut read) = ws.split();

    let writer_id = id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = write_frame(&mut write, message, write_timeout).await {
                warn!("Dropping connection {}: {}", writer_id, e);
                return;
            }
        }
        let _ = timeout(write_timeout, write.close()).await;
    });

    let reader_id = id.clone();
    let reader_events = events.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => match router::decode(&text) {
                    Ok(message) => {
                        let event = ServerEvent::Inbound {
                            id: reader_id.clone(),
                            message,
                        };
                        // Waits for room, so a flooding client only slows its own socket.
                        if reader_events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropped message from {}: {}", reader_id, e),
                },
                Ok(Message::Binary(_)) => {
                    warn!(
                        "Dropped message from {}: {}",
                        reader_id,
                        ProtocolError::UnsupportedFrame
                    );
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Read from {} failed: {}", reader_id, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    let _ = events.send(ServerEvent::Disconnected { id }).await;
}
