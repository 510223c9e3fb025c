//! Session registry module
//!
//! Tracks the blackjack table running in each guild and who is seated at it.

mod store;
mod types;

pub use store::SessionRegistry;
pub use types::{Game, GameStatus, Player, PlayerStatus, Seating};
