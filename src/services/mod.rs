pub mod conversation_service;
pub mod directory;
pub mod message_service;
pub mod notifications;
pub mod typing;
