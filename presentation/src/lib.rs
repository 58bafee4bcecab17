//! Presentation layer for kindergarten
//!
//! This crate contains CLI definitions, console formatters for the persisted
//! state, and the tally card shown for each nomination.

pub mod cli;
pub mod output;
pub mod view;

// Re-export commonly used types
pub use cli::commands::{Cli, Command};
pub use output::console::ConsoleFormatter;
pub use output::tally_card::{CardField, TallyCard};
pub use view::LogTallyView;
