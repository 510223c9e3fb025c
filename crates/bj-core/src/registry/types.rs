//! Table state types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Dealing,
}

/// Decision a seated player has declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Deciding,
    Hit,
    Stand,
}

/// A player seated at a guild's table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub status: PlayerStatus,
    /// Thread created for this player
    pub thread_id: String,
    /// Leading message of the thread, lists everyone at the table
    pub header_id: String,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(thread_id: impl Into<String>, header_id: impl Into<String>) -> Self {
        Self {
            status: PlayerStatus::Deciding,
            thread_id: thread_id.into(),
            header_id: header_id.into(),
            joined_at: Utc::now(),
        }
    }
}

/// A guild's blackjack table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub status: GameStatus,
    pub players: HashMap<String, Player>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Open a table with its first player seated
    pub fn new(first_player_id: impl Into<String>, seat: Player) -> Self {
        let mut players = HashMap::new();
        players.insert(first_player_id.into(), seat);
        Self {
            status: GameStatus::Dealing,
            players,
            created_at: Utc::now(),
        }
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Player ids ordered by the time they sat down
    pub fn seating_order(&self) -> Vec<String> {
        let mut seated: Vec<(&String, &Player)> = self.players.iter().collect();
        seated.sort_by(|a, b| a.1.joined_at.cmp(&b.1.joined_at).then_with(|| a.0.cmp(b.0)));
        seated.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Outcome of [`SessionRegistry::seat_player`](super::SessionRegistry::seat_player)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seating {
    /// No table existed; one was opened with this player
    OpenedTable,
    /// Player sat down at an existing table
    Joined,
}
