//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, users, banks) and shared utilities (open_db)
//! - `reports` - Installment report commands
//! - `serve` - Web server command

pub mod core;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use reports::*;
pub use serve::*;
