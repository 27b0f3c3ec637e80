use super::traits::{
    DisconnectReason, InboundMessage, OutboundMessage, Transport, TransportEvent,
};
use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use uuid::Uuid;

/// Console transport — stdin/stdout, always available, zero wire protocol.
///
/// One line is one direct-chat message from `operator@console`. `/quit`
/// (or EOF) ends the session for good; `/drop` simulates a retryable
/// connection loss so the reconnect path can be exercised locally.
/// Meant for a single session; two console sessions would fight over stdin.
pub struct ConsoleTransport {
    chat: String,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            chat: "console".to_string(),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn run(&self, tx: tokio::sync::mpsc::Sender<TransportEvent>) -> anyhow::Result<()> {
        tx.send(TransportEvent::Connected {
            self_id: "jaga@console".to_string(),
        })
        .await
        .ok();

        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" || line == "/exit" {
                tx.send(TransportEvent::Disconnected(DisconnectReason::LoggedOut))
                    .await
                    .ok();
                return Ok(());
            }
            if line == "/drop" {
                tx.send(TransportEvent::Disconnected(
                    DisconnectReason::ConnectionLost,
                ))
                .await
                .ok();
                return Ok(());
            }

            let msg = InboundMessage {
                id: Uuid::new_v4().to_string(),
                chat: self.chat.clone(),
                sender: "operator@console".to_string(),
                group: false,
                text: line,
                from_me: false,
                mentions: Vec::new(),
                quoted_sender: None,
                timestamp: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs(),
            };

            if tx.send(TransportEvent::Inbound(msg)).await.is_err() {
                break;
            }
        }

        // stdin closed under us — same as the operator logging out
        tx.send(TransportEvent::Disconnected(DisconnectReason::LoggedOut))
            .await
            .ok();
        Ok(())
    }

    async fn send_text(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        println!("{}", message.text);
        Ok(())
    }
}
