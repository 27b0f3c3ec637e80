//! Per-session connection state machine and inbound pipeline.
//!
//! One `SessionRuntime` instance lives for exactly one connection
//! attempt. It consumes the transport's event stream, keeps the lifecycle
//! state, publishes online/offline to the status board, routes inbound
//! text through the command dispatcher and, for unhandled messages while
//! the owner is offline, through the cooldown-gated responder.

use super::commands::{self, Dispatch};
use super::cooldown::{conversation_key, CooldownGate};
use super::reply;
use crate::persona::PersonaStore;
use crate::status::StatusBoard;
use crate::transport::{
    user_part, InboundMessage, OutboundMessage, Transport, TransportEvent,
};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Init,
    AwaitingPairing,
    Connected,
    Disconnected,
    Restarting,
    /// Terminal. Nothing is reachable from here.
    LoggedOut,
}

/// How a machine instance ended; the supervisor owns what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineExit {
    Restart,
    LoggedOut,
}

pub struct SessionRuntime {
    pub(crate) name: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn PersonaStore>,
    pub(crate) board: Arc<StatusBoard>,
    pub(crate) state: ConnectionState,
    /// Auto-reply active. Negation of the persisted online flag at
    /// construction; mutated only by the command dispatcher.
    pub(crate) offline_mode: bool,
    pub(crate) assistant: String,
    /// The bot's own numeric identity, known once connected.
    pub(crate) self_number: Option<String>,
    pub(crate) cooldowns: CooldownGate,
    saw_connection: bool,
}

impl SessionRuntime {
    pub fn new(
        name: String,
        transport: Arc<dyn Transport>,
        store: Arc<dyn PersonaStore>,
        board: Arc<StatusBoard>,
        cooldown_window: Duration,
    ) -> Self {
        let offline_mode = !store.online_flag(&name);
        let assistant = store.assistant_name(&name);
        Self {
            name,
            transport,
            store,
            board,
            state: ConnectionState::Init,
            offline_mode,
            assistant,
            self_number: None,
            cooldowns: CooldownGate::new(cooldown_window),
            saw_connection: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether this instance reached `Connected` at least once; the
    /// supervisor resets its backoff on that.
    pub fn saw_connection(&self) -> bool {
        self.saw_connection
    }

    /// Drives the machine until the connection ends. A closed event
    /// stream without a disconnect event counts as a retryable loss.
    pub async fn run(&mut self, rx: &mut mpsc::Receiver<TransportEvent>) -> MachineExit {
        while let Some(event) = rx.recv().await {
            match event {
                TransportEvent::Inbound(msg) => {
                    if let Err(e) = self.on_message(&msg).await {
                        tracing::warn!("[{}] message handling failed: {e:#}", self.name);
                    }
                }
                other => {
                    if let Some(exit) = self.on_connection_event(other) {
                        return exit;
                    }
                }
            }
        }

        tracing::warn!("[{}] transport stream ended unexpectedly", self.name);
        self.state = ConnectionState::Restarting;
        self.board.mark_offline(&self.name);
        MachineExit::Restart
    }

    pub fn on_connection_event(&mut self, event: TransportEvent) -> Option<MachineExit> {
        match event {
            TransportEvent::PairingChallenge(payload) => {
                if matches!(
                    self.state,
                    ConnectionState::Init | ConnectionState::AwaitingPairing
                ) {
                    self.state = ConnectionState::AwaitingPairing;
                    self.board.set_pairing(&self.name, &payload);
                    tracing::info!(
                        "[{}] 📲 pairing challenge outstanding, open /qr on the panel to scan",
                        self.name
                    );
                    match render_terminal_qr(&payload) {
                        Ok(rendered) => eprintln!("{rendered}"),
                        Err(e) => tracing::warn!("[{}] QR render failed: {e}", self.name),
                    }
                } else {
                    tracing::debug!(
                        "[{}] ignoring pairing challenge in state {:?}",
                        self.name,
                        self.state
                    );
                }
                None
            }
            TransportEvent::Connected { self_id } => {
                self.state = ConnectionState::Connected;
                self.saw_connection = true;
                self.self_number = Some(user_part(&self_id).to_string());
                self.board.mark_online(&self.name);
                tracing::info!("[{}] ✅ connected as {self_id}", self.name);
                None
            }
            TransportEvent::Disconnected(reason) => {
                self.state = ConnectionState::Disconnected;
                self.board.mark_offline(&self.name);
                if reason.is_terminal() {
                    tracing::warn!("[{}] ❌ logged out, not reconnecting", self.name);
                    self.state = ConnectionState::LoggedOut;
                    Some(MachineExit::LoggedOut)
                } else {
                    tracing::warn!("[{}] ❌ disconnected ({reason:?})", self.name);
                    self.state = ConnectionState::Restarting;
                    Some(MachineExit::Restart)
                }
            }
            TransportEvent::Inbound(_) => None,
        }
    }

    /// One inbound message. Self-sent messages are dropped outright;
    /// commands run first and short-circuit the responder.
    async fn on_message(&mut self, msg: &InboundMessage) -> Result<()> {
        if msg.from_me {
            return Ok(());
        }
        if commands::dispatch(self, msg).await? == Dispatch::Handled {
            return Ok(());
        }
        self.maybe_auto_reply(msg).await
    }

    async fn maybe_auto_reply(&mut self, msg: &InboundMessage) -> Result<()> {
        if !self.offline_mode {
            return Ok(());
        }

        if msg.group && !self.is_addressed(msg) {
            return Ok(());
        }

        let key = conversation_key(msg);
        if !self.cooldowns.permit(&key, Instant::now()) {
            return Ok(());
        }

        let owner = reply::owner_call(&self.store.owner(&self.name));
        let offline = self.store.offline_reason(&self.name);
        let greeting = reply::greeting_now();

        let (text, mentions) = if msg.group {
            (
                reply::group_reply(
                    greeting,
                    user_part(&msg.sender),
                    &owner,
                    &offline.reason,
                    &offline.time,
                    &self.assistant,
                ),
                vec![msg.sender.clone()],
            )
        } else {
            (
                reply::direct_reply(
                    greeting,
                    &owner,
                    &offline.reason,
                    &offline.time,
                    &self.assistant,
                ),
                Vec::new(),
            )
        };

        self.send(msg.chat.clone(), text, mentions).await
    }

    /// Group trigger: the bot is named in the text, tagged in the mention
    /// list, or the message replies to one of the bot's.
    fn is_addressed(&self, msg: &InboundMessage) -> bool {
        let Some(bot) = self.self_number.as_deref() else {
            return false;
        };
        let tagged = msg.mentions.iter().any(|jid| user_part(jid) == bot);
        let named = msg.text.contains(bot);
        let replied = msg
            .quoted_sender
            .as_deref()
            .is_some_and(|quoted| user_part(quoted).contains(bot));
        tagged || named || replied
    }

    pub(crate) async fn send(
        &self,
        chat: String,
        text: String,
        mentions: Vec<String>,
    ) -> Result<()> {
        self.transport
            .send_text(&OutboundMessage {
                chat,
                text,
                mentions,
            })
            .await
    }
}

/// Render a pairing payload as a terminal-friendly QR block.
pub fn render_terminal_qr(payload: &str) -> Result<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        anyhow::bail!("QR payload is empty");
    }

    let qr = qrcode::QrCode::new(payload.as_bytes())
        .map_err(|err| anyhow!("failed to encode pairing QR payload: {err}"))?;

    Ok(qr
        .render::<qrcode::render::unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}
