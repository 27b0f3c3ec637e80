//! Auto-reply gate: at most one reply per conversation key per window.

use crate::transport::{user_part, InboundMessage};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Owned by exactly one session; never shared across sessions.
pub struct CooldownGate {
    window: Duration,
    last_sent: HashMap<String, Instant>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
        }
    }

    /// Whether a reply to `key` may be sent at `now`. When permitted the
    /// window is armed immediately, before any send is attempted, so a
    /// slow or failing send cannot re-open it.
    pub fn permit(&mut self, key: &str, now: Instant) -> bool {
        match self.last_sent.get(key) {
            Some(last) if now.saturating_duration_since(*last) < self.window => false,
            _ => {
                self.last_sent.insert(key.to_string(), now);
                true
            }
        }
    }
}

/// Cooldown scope: per sender within a group, per conversation otherwise.
pub fn conversation_key(msg: &InboundMessage) -> String {
    if msg.group {
        format!("{}:{}", msg.chat, user_part(&msg.sender))
    } else {
        msg.chat.clone()
    }
}
