//! Rules configuration.
//!
//! `RulesConfig` holds the numeric knobs of the rules engine. Every field
//! has a default matching the printed game rules, and the struct
//! deserializes with missing fields filled from those defaults:
//!
//! ```
//! use rust_lorcana::core::RulesConfig;
//!
//! let config: RulesConfig = serde_json::from_str(r#"{ "lore_to_win": 10 }"#).unwrap();
//! assert_eq!(config.lore_to_win, 10);
//! assert_eq!(config.opening_hand_size, 7);
//! ```

use serde::{Deserialize, Serialize};

/// Engine-wide rules parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Lore needed to win.
    pub lore_to_win: u32,

    /// Cards drawn into each hand when the game starts.
    pub opening_hand_size: usize,

    /// Maximum nesting of triggered abilities resolving inside other
    /// triggered abilities before the engine gives up with a fatal error.
    pub max_trigger_depth: u32,

    /// Whether the starting player draws on their first turn.
    pub starting_player_draws: bool,

    /// Shuffle decks when the game starts. Disabled in scripted tests.
    pub shuffle_decks: bool,

    /// Number of seats. The rules engine supports exactly two.
    pub player_count: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            lore_to_win: 20,
            opening_hand_size: 7,
            max_trigger_depth: 32,
            starting_player_draws: false,
            shuffle_decks: true,
            player_count: 2,
        }
    }
}

impl RulesConfig {
    /// Set the lore win threshold.
    #[must_use]
    pub fn with_lore_to_win(mut self, lore: u32) -> Self {
        self.lore_to_win = lore;
        self
    }

    /// Set the opening hand size.
    #[must_use]
    pub fn with_opening_hand(mut self, size: usize) -> Self {
        self.opening_hand_size = size;
        self
    }

    /// Set the trigger recursion limit.
    #[must_use]
    pub fn with_max_trigger_depth(mut self, depth: u32) -> Self {
        self.max_trigger_depth = depth;
        self
    }

    /// Keep decks in the order they were supplied.
    #[must_use]
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle_decks = false;
        self
    }
}
