pub mod api;
pub mod config;
pub mod conversation;
pub mod persona;
pub mod state;

// Re-export main types for convenience
pub use api::{ChatTransport, EldermindClient, TransportError};
pub use config::Config;
pub use conversation::{ChatExchange, Conversation, SEND_FAILED_MESSAGE};
pub use persona::{Persona, PersonaParseError};
pub use state::{ChatMessage, ChatRole};
