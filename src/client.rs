#![cfg(feature = "std")]

//! Single-writer actor driving one server connection.
//!
//! The actor owns the transport, the dispatcher, the session and the
//! keep-alive schedule. Everything else talks to it through a
//! [`ClientHandle`] and listens for [`Effect`]s on a channel.

use tokio::sync::{mpsc, oneshot};

use crate::board::{Board, Coord};
use crate::config::ClientConfig;
use crate::protocol::{Dispatcher, Request};
use crate::session::inbound::{await_reply, register_pushes};
use crate::session::{Declined, Effect, Event, RoomState, Session};
use crate::transport::keep_alive::{self, KeepAlive};
use crate::transport::Transport;

const COMMAND_QUEUE: usize = 16;

/// User intents accepted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Handshake(String),
    CreateRoom,
    JoinRoom(String),
    LeaveRoom,
    DeclareReady(Board),
    Fire(Coord),
    NewGame,
}

enum Command {
    Intent(Intent, oneshot::Sender<Result<(), Declined>>),
    Snapshot(oneshot::Sender<RoomState>),
    Close,
}

/// Why [`Client::run`] stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Closed locally, or every handle was dropped.
    Closed,
    /// The server sent `CONN_TERM`.
    Terminated,
}

pub struct Client<T: Transport> {
    transport: T,
    dispatcher: Dispatcher<Event>,
    session: Session,
    keep_alive: KeepAlive,
    commands: mpsc::Receiver<Command>,
    effects: mpsc::UnboundedSender<Effect>,
}

impl<T: Transport> Client<T> {
    pub fn new(
        transport: T,
        config: &ClientConfig,
    ) -> (Self, ClientHandle, mpsc::UnboundedReceiver<Effect>) {
        Self::with_keep_alive(transport, KeepAlive::from_config(config))
    }

    pub fn with_keep_alive(
        transport: T,
        keep_alive: KeepAlive,
    ) -> (Self, ClientHandle, mpsc::UnboundedReceiver<Effect>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (effects, effect_rx) = mpsc::unbounded_channel();
        let mut dispatcher = Dispatcher::new();
        register_pushes(&mut dispatcher);
        let client = Self {
            transport,
            dispatcher,
            session: Session::new(),
            keep_alive,
            commands,
            effects,
        };
        (client, ClientHandle { commands: command_tx }, effect_rx)
    }

    /// Serve the connection until it is closed from either side.
    ///
    /// The session is reset and its effects published however the loop
    /// ends; pending replies are discarded.
    pub async fn run(mut self) -> anyhow::Result<Exit> {
        self.keep_alive.restart();
        let result = self.serve().await;
        if let Err(e) = &result {
            log::error!("Connection failed: {:#}", e);
        }
        self.dispatcher.reset();
        let effects = self.session.apply(Event::ConnectionClosed);
        self.publish(effects);
        result
    }

    async fn serve(&mut self) -> anyhow::Result<Exit> {
        loop {
            let deadline = self.keep_alive.deadline();
            tokio::select! {
                received = self.transport.recv() => {
                    let bytes = received?;
                    self.keep_alive.mark_activity();
                    let mut events = Vec::new();
                    let fed = self.dispatcher.feed_into(&bytes, &mut events);
                    for event in events {
                        let terminated = event == Event::Terminated;
                        let effects = self.session.apply(event);
                        if effects.iter().any(Effect::is_lobby_return) {
                            // Replies to requests made in the old room no longer apply.
                            self.dispatcher.clear_waiters();
                        }
                        self.publish(effects);
                        if terminated {
                            log::info!("Server terminated the connection");
                            return Ok(Exit::Terminated);
                        }
                    }
                    fed?;
                }
                _ = self.keep_alive.tick() => {
                    self.send(&Request::KeepAlive).await?;
                }
                _ = keep_alive::until(deadline) => {
                    return Err(anyhow::anyhow!(
                        "No data received for {:?}",
                        self.keep_alive.idle_timeout().unwrap_or_default()
                    ));
                }
                command = self.commands.recv() => match command {
                    Some(Command::Intent(intent, reply)) => {
                        let outcome = self.perform(intent).await?;
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.session.state().clone());
                    }
                    Some(Command::Close) | None => return Ok(Exit::Closed),
                },
            }
        }
    }

    /// Validate an intent against the session and issue its request.
    ///
    /// The outer error is a connection failure, the inner one a local
    /// refusal.
    async fn perform(&mut self, intent: Intent) -> anyhow::Result<Result<(), Declined>> {
        let session = &mut self.session;
        let request = match intent {
            Intent::Handshake(nickname) => session.handshake(&nickname),
            Intent::CreateRoom => session.create_room(),
            Intent::JoinRoom(code) => session.join_room(&code),
            Intent::LeaveRoom => session.leave_room(),
            Intent::DeclareReady(board) => session.declare_ready(&board),
            Intent::Fire(coord) => session.fire(coord),
            Intent::NewGame => {
                return Ok(session.new_game().map(|effects| self.publish(effects)));
            }
        };
        let request = match request {
            Ok(request) => request,
            Err(declined) => {
                log::debug!("Declined: {}", declined);
                return Ok(Err(declined));
            }
        };
        if let Err(declined) = await_reply(&mut self.dispatcher, &request) {
            self.session.abandon(&request);
            return Ok(Err(declined));
        }
        self.send(&request).await?;
        Ok(Ok(()))
    }

    async fn send(&mut self, request: &Request) -> anyhow::Result<()> {
        self.transport.send(&request.to_message()).await
    }

    fn publish(&self, effects: Vec<Effect>) {
        for effect in effects {
            // Nobody listening is fine.
            let _ = self.effects.send(effect);
        }
    }
}

/// Cloneable front end of a running [`Client`].
#[derive(Clone)]
pub struct ClientHandle {
    commands: mpsc::Sender<Command>,
}

impl ClientHandle {
    async fn intent(&self, intent: Intent) -> Result<(), Declined> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Intent(intent, tx))
            .await
            .map_err(|_| Declined::Disconnected)?;
        rx.await.map_err(|_| Declined::Disconnected)?
    }

    pub async fn handshake(&self, nickname: impl Into<String>) -> Result<(), Declined> {
        self.intent(Intent::Handshake(nickname.into())).await
    }

    pub async fn create_room(&self) -> Result<(), Declined> {
        self.intent(Intent::CreateRoom).await
    }

    pub async fn join_room(&self, code: impl Into<String>) -> Result<(), Declined> {
        self.intent(Intent::JoinRoom(code.into())).await
    }

    pub async fn leave_room(&self) -> Result<(), Declined> {
        self.intent(Intent::LeaveRoom).await
    }

    pub async fn declare_ready(&self, board: Board) -> Result<(), Declined> {
        self.intent(Intent::DeclareReady(board)).await
    }

    pub async fn fire(&self, coord: Coord) -> Result<(), Declined> {
        self.intent(Intent::Fire(coord)).await
    }

    pub async fn new_game(&self) -> Result<(), Declined> {
        self.intent(Intent::NewGame).await
    }

    /// Copy of the current room state, `None` once the client has stopped.
    pub async fn snapshot(&self) -> Option<RoomState> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    pub async fn close(&self) {
        let _ = self.commands.send(Command::Close).await;
    }
}
