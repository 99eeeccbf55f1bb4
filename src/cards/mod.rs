//! Card system: definitions, instances, and registry.
//!
//! ## Key Types
//!
//! - `CardId`: Identifier for card definitions
//! - `Card`: Static card data (name, cost, type, stats, rules text)
//! - `CardInstance`: Runtime card state (zone, owner, damage, readiness)
//! - `DerivedStats`: Values the continuous effect engine recomputes
//! - `CardRegistry`: Definition lookup plus compiled abilities

pub mod definition;
pub mod instance;
pub mod registry;

pub use definition::{AbilityHint, AbilityText, Card, CardId, CardType, InkColor};
pub use instance::{CardInstance, DerivedStats, KeywordSet};
pub use registry::CardRegistry;
