pub mod connection;
pub mod message_router;

pub use connection::{handle_socket, ConnectionManager, SharedConnectionManager};
pub use message_router::{DefaultMessageRouter, MessageRouter};
