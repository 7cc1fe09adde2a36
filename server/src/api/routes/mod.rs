//! API route modules

pub mod chats;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod users;
