//! Data layer: SQLite persistence, media file storage, push fan-out

pub mod files;
pub mod push;
pub mod sqlite;
pub mod types;
