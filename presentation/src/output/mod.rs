//! Output formatting

pub mod console;
pub mod tally_card;
