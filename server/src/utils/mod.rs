//! Small shared utilities

pub mod crypto;
pub mod file;
