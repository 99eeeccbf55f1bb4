//! Core engine types: instance ids, players, state, actions, RNG, configuration.

pub mod action;
pub mod config;
pub mod entity;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{ActionRecord, GameAction};
pub use config::RulesConfig;
pub use entity::InstanceId;
pub use player::{PlayerId, PlayerMap, PlayerState};
pub use rng::GameRng;
pub use state::GameState;
