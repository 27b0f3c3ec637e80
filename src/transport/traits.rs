use async_trait::async_trait;

/// An inbound message envelope as delivered by the wire protocol.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    /// Conversation id (chat JID). Groups and direct chats share this field.
    pub chat: String,
    /// Author JID: the participant in a group, the chat peer in a direct chat.
    pub sender: String,
    pub group: bool,
    pub text: String,
    /// Sent by the bot's own account. Never answered, never dispatched.
    pub from_me: bool,
    /// JIDs explicitly tagged in the message body.
    pub mentions: Vec<String>,
    /// JID of the quoted message's author, when this message is a reply.
    pub quoted_sender: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub chat: String,
    pub text: String,
    pub mentions: Vec<String>,
}

/// Reason code attached to a connection loss.
///
/// Only `LoggedOut` is terminal; everything else — including codes this
/// crate has never seen — is retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The operator ended the session from the phone. No reconnect.
    LoggedOut,
    ConnectionClosed,
    ConnectionLost,
    ConnectionReplaced,
    Unknown(u32),
}

impl DisconnectReason {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Connection lifecycle and message events emitted by a transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing credential is outstanding (QR payload). A newer challenge
    /// replaces any prior one.
    PairingChallenge(String),
    Connected {
        /// The bot's own JID on this connection.
        self_id: String,
    },
    Disconnected(DisconnectReason),
    Inbound(InboundMessage),
}

/// Core transport trait — implement for any chat wire protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Connect and pump events into `tx` until the connection ends
    /// (long-running). Returning without a `Disconnected` event is treated
    /// as a retryable connection loss by the caller.
    async fn run(&self, tx: tokio::sync::mpsc::Sender<TransportEvent>) -> anyhow::Result<()>;

    /// Send a text message through this transport.
    async fn send_text(&self, message: &OutboundMessage) -> anyhow::Result<()>;
}

/// The user part of a JID: `628123:4@s.whatsapp.net` → `628123`.
pub fn user_part(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    user.split(':').next().unwrap_or(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyTransport;

    #[async_trait]
    impl Transport for DummyTransport {
        fn name(&self) -> &str {
            "dummy"
        }

        async fn run(
            &self,
            tx: tokio::sync::mpsc::Sender<TransportEvent>,
        ) -> anyhow::Result<()> {
            tx.send(TransportEvent::Connected {
                self_id: "1@local".into(),
            })
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
        }

        async fn send_text(&self, _message: &OutboundMessage) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn user_part_strips_domain() {
        assert_eq!(user_part("628123@s.whatsapp.net"), "628123");
    }

    #[test]
    fn user_part_strips_device_suffix() {
        assert_eq!(user_part("628123:12@s.whatsapp.net"), "628123");
    }

    #[test]
    fn user_part_passes_through_bare_ids() {
        assert_eq!(user_part("operator"), "operator");
    }

    #[test]
    fn only_logged_out_is_terminal() {
        assert!(DisconnectReason::LoggedOut.is_terminal());
        assert!(!DisconnectReason::ConnectionClosed.is_terminal());
        assert!(!DisconnectReason::ConnectionLost.is_terminal());
        assert!(!DisconnectReason::ConnectionReplaced.is_terminal());
        assert!(!DisconnectReason::Unknown(515).is_terminal());
    }

    #[tokio::test]
    async fn run_delivers_events_to_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        DummyTransport.run(tx).await.unwrap();

        match rx.recv().await.expect("event should be sent") {
            TransportEvent::Connected { self_id } => assert_eq!(self_id, "1@local"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
