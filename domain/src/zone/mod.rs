//! Confinement zones ("kindergartens") and their attendees
//!
//! ```text
//! ZoneRegistry ── RwLock ──┬── Zone (community 1) ── settings, role cache
//!                          │      └── AttendeeList ── Mutex<Vec<Attendee>>
//!                          └── Zone (community 2)
//!                                 └── AttendeeList
//! ```

pub mod entities;
pub mod registry;

pub use entities::{Attendee, AttendeeList, RoleSnapshot, Zone, ZoneSettings};
pub use registry::{Placement, Upserted, ZoneRegistry};
