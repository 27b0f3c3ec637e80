//! Administrative command grammar.
//!
//! Patterns are evaluated in a fixed priority order; the first match wins
//! and terminates dispatch, except `!ping`, which replies and lets the
//! remaining checks run. A handled message never reaches the responder.

use super::machine::SessionRuntime;
use super::reply;
use crate::persona::{Gender, PersonaStore};
use crate::transport::InboundMessage;
use anyhow::Result;
use chrono::Local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    NotHandled,
}

pub(crate) async fn dispatch(
    session: &mut SessionRuntime,
    msg: &InboundMessage,
) -> Result<Dispatch> {
    let text = msg.text.as_str();
    let mut handled = false;

    if text.eq_ignore_ascii_case("!ping") {
        session
            .send(msg.chat.clone(), "*Pong!*".to_string(), Vec::new())
            .await?;
        handled = true;
    }

    if text == "!status" {
        let lines = session.board.status_lines().join("\n");
        session
            .send(
                msg.chat.clone(),
                format!("📊 *Status semua akun:* \n{lines}"),
                Vec::new(),
            )
            .await?;
        return Ok(Dispatch::Handled);
    }

    if let Some(rest) = text.strip_prefix("!off ") {
        let reason = rest.trim();
        let now = Local::now();

        session.offline_mode = true;
        session.store.set_online_flag(&session.name, false)?;
        if !reason.is_empty() {
            session
                .store
                .set_offline_reason(&session.name, reason, &reply::format_waktu(&now))?;
        }

        let mut confirm = String::from("🤖 Mode offline diaktifkan.");
        if !reason.is_empty() {
            confirm.push_str(&format!("\n📝 Alasan: *{reason}*"));
        }
        confirm.push_str(&format!("\n⏱ Waktu: *{}*", reply::format_waktu_short(&now)));

        session.send(msg.chat.clone(), confirm, Vec::new()).await?;
        return Ok(Dispatch::Handled);
    }

    if text == "!on" {
        session.offline_mode = false;
        session.store.set_online_flag(&session.name, true)?;
        session
            .send(
                msg.chat.clone(),
                "🤖 Mode online diaktifkan.".to_string(),
                Vec::new(),
            )
            .await?;
        return Ok(Dispatch::Handled);
    }

    if let Some(rest) = text.strip_prefix("!defaultasisten ") {
        let name = rest.trim();
        if !name.is_empty() {
            session.assistant = name.to_string();
            session.store.set_assistant_name(&session.name, name)?;
            session
                .send(
                    msg.chat.clone(),
                    format!("✅ Default asisten sekarang: *{name}*"),
                    Vec::new(),
                )
                .await?;
        }
        return Ok(Dispatch::Handled);
    }

    if let Some(rest) = text.strip_prefix("!setowner ") {
        let mut parts = rest.splitn(2, '|');
        let name = parts.next().unwrap_or("").trim();
        let gender_raw = parts.next().map(|g| g.trim().to_lowercase());

        if name.is_empty() {
            session
                .send(
                    msg.chat.clone(),
                    "⚠️ Format salah.\nContoh: *!setowner <nama> | <male/female>*".to_string(),
                    Vec::new(),
                )
                .await?;
            return Ok(Dispatch::Handled);
        }

        let gender = gender_raw.as_deref().and_then(Gender::parse);
        session.store.set_owner(&session.name, name, gender)?;

        let suffix = match gender_raw.as_deref() {
            Some(g) if !g.is_empty() => format!("(gender: {g})"),
            _ => String::new(),
        };
        session
            .send(
                msg.chat.clone(),
                format!("👑 Owner diset ke: *{name}* {suffix}"),
                Vec::new(),
            )
            .await?;
        return Ok(Dispatch::Handled);
    }

    Ok(if handled {
        Dispatch::Handled
    } else {
        Dispatch::NotHandled
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{JsonPersonaStore, PersonaStore};
    use crate::status::StatusBoard;
    use crate::transport::{OutboundMessage, Transport, TransportEvent};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct RecordingTransport {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn name(&self) -> &str {
            "recording"
        }

        async fn run(&self, _tx: mpsc::Sender<TransportEvent>) -> Result<()> {
            Ok(())
        }

        async fn send_text(&self, message: &OutboundMessage) -> Result<()> {
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<RecordingTransport>,
        store: Arc<JsonPersonaStore>,
        session: SessionRuntime,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        let store = Arc::new(JsonPersonaStore::new(dir.path()));
        let board = Arc::new(StatusBoard::new());
        board.register("auth_info_alfa");
        board.mark_online("auth_info_alfa");
        board.register("auth_info_beta");
        let session = SessionRuntime::new(
            "auth_info_alfa".to_string(),
            transport.clone(),
            store.clone(),
            board,
            Duration::from_secs(300),
        );
        Fixture {
            _dir: dir,
            transport,
            store,
            session,
        }
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            id: "m".into(),
            chat: "628777@s.whatsapp.net".into(),
            sender: "628777@s.whatsapp.net".into(),
            group: false,
            text: text.into(),
            from_me: false,
            mentions: Vec::new(),
            quoted_sender: None,
            timestamp: 0,
        }
    }

    fn sent_texts(transport: &RecordingTransport) -> Vec<String> {
        transport.sent.lock().iter().map(|m| m.text.clone()).collect()
    }

    #[tokio::test]
    async fn ping_replies_pong_case_insensitive() {
        let mut f = fixture();
        assert_eq!(
            dispatch(&mut f.session, &msg("!PiNg")).await.unwrap(),
            Dispatch::Handled
        );
        assert_eq!(sent_texts(&f.transport), vec!["*Pong!*".to_string()]);
    }

    #[tokio::test]
    async fn status_lists_every_known_session() {
        let mut f = fixture();
        dispatch(&mut f.session, &msg("!status")).await.unwrap();
        let texts = sent_texts(&f.transport);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("📊 *Status semua akun:* \n"));
        assert!(texts[0].contains("• *auth_info_alfa*: 🟢 Online"));
        assert!(texts[0].contains("• *auth_info_beta*: 🔴 Offline"));
    }

    #[tokio::test]
    async fn off_with_reason_persists_and_confirms() {
        let mut f = fixture();
        assert!(!f.session.offline_mode);

        dispatch(&mut f.session, &msg("!off Meeting")).await.unwrap();

        assert!(f.session.offline_mode);
        assert!(!f.store.online_flag("auth_info_alfa"));
        let persisted = f.store.offline_reason("auth_info_alfa");
        assert_eq!(persisted.reason, "Meeting");
        assert!(persisted.time.contains("pukul"));

        let texts = sent_texts(&f.transport);
        assert!(texts[0].contains("🤖 Mode offline diaktifkan."));
        assert!(texts[0].contains("📝 Alasan: *Meeting*"));
        assert!(texts[0].contains("⏱ Waktu:"));
    }

    #[tokio::test]
    async fn off_without_reason_keeps_previous_reason() {
        let mut f = fixture();
        f.store
            .set_offline_reason("auth_info_alfa", "Cuti", "kemarin")
            .unwrap();

        dispatch(&mut f.session, &msg("!off  ")).await.unwrap();

        assert!(f.session.offline_mode);
        assert_eq!(f.store.offline_reason("auth_info_alfa").reason, "Cuti");
        let texts = sent_texts(&f.transport);
        assert!(!texts[0].contains("📝 Alasan"));
    }

    #[tokio::test]
    async fn on_restores_online_flag() {
        let mut f = fixture();
        dispatch(&mut f.session, &msg("!off Meeting")).await.unwrap();
        dispatch(&mut f.session, &msg("!on")).await.unwrap();

        assert!(!f.session.offline_mode);
        assert!(f.store.online_flag("auth_info_alfa"));
        let texts = sent_texts(&f.transport);
        assert_eq!(texts[1], "🤖 Mode online diaktifkan.");
    }

    #[tokio::test]
    async fn defaultasisten_updates_session_and_store() {
        let mut f = fixture();
        dispatch(&mut f.session, &msg("!defaultasisten Sari"))
            .await
            .unwrap();

        assert_eq!(f.session.assistant, "Sari");
        assert_eq!(f.store.assistant_name("auth_info_alfa"), "Sari");
        assert_eq!(
            sent_texts(&f.transport),
            vec!["✅ Default asisten sekarang: *Sari*".to_string()]
        );
    }

    #[tokio::test]
    async fn defaultasisten_empty_is_handled_silently() {
        let mut f = fixture();
        let outcome = dispatch(&mut f.session, &msg("!defaultasisten   "))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(f.session.assistant, "Bot");
        assert!(f.transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn setowner_persists_name_and_gender() {
        let mut f = fixture();
        dispatch(&mut f.session, &msg("!setowner Budi|female"))
            .await
            .unwrap();

        let owner = f.store.owner("auth_info_alfa");
        assert_eq!(owner.name, "Budi");
        assert_eq!(owner.gender, Some(Gender::Female));
        let texts = sent_texts(&f.transport);
        assert!(texts[0].contains("👑 Owner diset ke: *Budi*"));
        assert!(texts[0].contains("(gender: female)"));
    }

    #[tokio::test]
    async fn setowner_empty_name_replies_usage_and_mutates_nothing() {
        let mut f = fixture();
        let outcome = dispatch(&mut f.session, &msg("!setowner  |female"))
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        let owner = f.store.owner("auth_info_alfa");
        assert_eq!(owner.name, "Pemilik");
        assert_eq!(owner.gender, None);
        let texts = sent_texts(&f.transport);
        assert!(texts[0].starts_with("⚠️ Format salah."));
    }

    #[tokio::test]
    async fn setowner_invalid_gender_is_not_persisted() {
        let mut f = fixture();
        dispatch(&mut f.session, &msg("!setowner Budi|robot"))
            .await
            .unwrap();

        let owner = f.store.owner("auth_info_alfa");
        assert_eq!(owner.name, "Budi");
        assert_eq!(owner.gender, None);
        // the confirmation still echoes what was typed
        assert!(sent_texts(&f.transport)[0].contains("(gender: robot)"));
    }

    #[tokio::test]
    async fn plain_text_is_not_handled() {
        let mut f = fixture();
        let outcome = dispatch(&mut f.session, &msg("halo, ada orang?"))
            .await
            .unwrap();
        assert_eq!(outcome, Dispatch::NotHandled);
        assert!(f.transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn bare_off_without_space_is_not_a_command() {
        let mut f = fixture();
        let outcome = dispatch(&mut f.session, &msg("!off")).await.unwrap();
        assert_eq!(outcome, Dispatch::NotHandled);
        assert!(!f.session.offline_mode);
    }

    #[tokio::test]
    async fn off_and_on_keep_flag_and_mode_in_sync() {
        let mut f = fixture();
        for (command, expected_offline) in [("!off Rapat", true), ("!on", false), ("!off X", true)]
        {
            dispatch(&mut f.session, &msg(command)).await.unwrap();
            assert_eq!(f.session.offline_mode, expected_offline);
            assert_eq!(f.store.online_flag("auth_info_alfa"), !expected_offline);
        }
    }
}
