pub mod message;
pub mod order;
pub mod stage;
pub mod user;

pub use message::{ConnectionStatus, ConnectionStatusData, MessageType, WebSocketMessage};
