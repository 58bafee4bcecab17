//! Core domain primitives: identifiers, permission bits and errors.

pub mod error;
pub mod ids;
pub mod permissions;
