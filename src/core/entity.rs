//! Card instance identification.
//!
//! Every card that exists in a game gets an `InstanceId` when it is first
//! put into a zone. Ids are allocated sequentially by `GameState`, so
//! comparing ids gives the order in which instances were created. The
//! trigger registry and the continuous effect engine rely on that order
//! for deterministic iteration.
//!
//! ```
//! use rust_lorcana::core::InstanceId;
//!
//! let a = InstanceId::new(3);
//! let b = InstanceId::new(7);
//! assert!(a < b);
//! assert_eq!(format!("{}", a), "Instance(3)");
//! ```

use serde::{Deserialize, Serialize};

/// Unique identifier for a card instance within one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// Create an instance ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for InstanceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}
