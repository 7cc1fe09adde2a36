//! Repository functions over the SQLite pool
//!
//! List operations take the caller's scope, an optional filter predicate
//! and a page spec, and return the page of rows plus the unpaged total.

pub mod chats;
pub mod messages;
pub mod users;
