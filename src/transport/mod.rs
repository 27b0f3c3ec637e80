pub mod console;
pub mod traits;

pub use console::ConsoleTransport;
pub use traits::{
    user_part, DisconnectReason, InboundMessage, OutboundMessage, Transport, TransportEvent,
};
