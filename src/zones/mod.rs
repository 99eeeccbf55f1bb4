//! Zone system.
//!
//! Each player owns a deck, hand, play area, discard, inkwell, and a
//! holding area for cards underneath shifted characters.

pub mod manager;

pub use manager::{Zone, ZoneKey, ZoneManager, ZonePosition};
