//! Session supervision — one connection state machine, command
//! dispatcher and cooldown-gated responder per discovered chat account.

pub mod commands;
pub mod cooldown;
pub mod machine;
pub mod reply;
pub mod supervisor;

pub use commands::Dispatch;
pub use cooldown::{conversation_key, CooldownGate};
pub use machine::{ConnectionState, MachineExit, SessionRuntime};
pub use supervisor::{
    discover_sessions, DiscoveryError, SessionId, Supervisor, TransportFactory,
    SESSION_DIR_PREFIX,
};
