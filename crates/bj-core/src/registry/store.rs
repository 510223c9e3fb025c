//! Guild-keyed table registry
//!
//! Backed by a `DashMap`, so every operation locks only the shard holding
//! the guild's entry. Reads hand out clones, never references into the map.

use std::collections::HashMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::registry::{Game, GameStatus, Player, PlayerStatus, Seating};
use crate::{Error, Result};

/// In-memory registry of running tables, one per guild
#[derive(Debug, Default)]
pub struct SessionRegistry {
    games: DashMap<String, Game>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
        }
    }

    /// Open a table for a guild with its first player seated.
    ///
    /// Fails with [`Error::GameAlreadyExists`] instead of replacing a running
    /// table.
    pub fn add_new_game(
        &self,
        guild_id: &str,
        thread_id: &str,
        header_id: &str,
        first_player_id: &str,
    ) -> Result<()> {
        match self.games.entry(guild_id.to_string()) {
            Entry::Occupied(_) => Err(Error::GameAlreadyExists(guild_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Game::new(first_player_id, Player::new(thread_id, header_id)));
                info!("Opened table in guild {} for {}", guild_id, first_player_id);
                Ok(())
            }
        }
    }

    /// Seat a player at an existing table
    pub fn add_player(
        &self,
        guild_id: &str,
        player_id: &str,
        thread_id: &str,
        header_id: &str,
    ) -> Result<()> {
        let mut game = self
            .games
            .get_mut(guild_id)
            .ok_or_else(|| Error::GameNotFound(guild_id.to_string()))?;

        if game.has_player(player_id) {
            return Err(Error::AlreadyJoined {
                guild_id: guild_id.to_string(),
                player_id: player_id.to_string(),
            });
        }

        game.players
            .insert(player_id.to_string(), Player::new(thread_id, header_id));
        debug!(
            "Seated {} in guild {} ({} at table)",
            player_id,
            guild_id,
            game.player_count()
        );
        Ok(())
    }

    /// Open the guild's table or join it, as one step.
    ///
    /// Two concurrent callers for an empty guild cannot both open a table:
    /// the loser joins the winner's table.
    pub fn seat_player(
        &self,
        guild_id: &str,
        player_id: &str,
        thread_id: &str,
        header_id: &str,
    ) -> Result<Seating> {
        match self.games.entry(guild_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Game::new(player_id, Player::new(thread_id, header_id)));
                info!("Opened table in guild {} for {}", guild_id, player_id);
                Ok(Seating::OpenedTable)
            }
            Entry::Occupied(mut slot) => {
                let game = slot.get_mut();
                if game.has_player(player_id) {
                    return Err(Error::AlreadyJoined {
                        guild_id: guild_id.to_string(),
                        player_id: player_id.to_string(),
                    });
                }
                game.players
                    .insert(player_id.to_string(), Player::new(thread_id, header_id));
                debug!("Seated {} at running table in guild {}", player_id, guild_id);
                Ok(Seating::Joined)
            }
        }
    }

    /// Whether the player is seated in the guild's game (false without a game)
    pub fn game_has_player(&self, guild_id: &str, player_id: &str) -> bool {
        self.games
            .get(guild_id)
            .is_some_and(|game| game.has_player(player_id))
    }

    pub fn guild_has_game(&self, guild_id: &str) -> bool {
        self.games.contains_key(guild_id)
    }

    /// Snapshot of the guild's game
    pub fn get_game(&self, guild_id: &str) -> Option<Game> {
        self.games.get(guild_id).map(|game| game.clone())
    }

    /// Snapshot of everyone seated at the guild's table
    pub fn get_players(&self, guild_id: &str) -> Result<HashMap<String, Player>> {
        self.games
            .get(guild_id)
            .map(|game| game.players.clone())
            .ok_or_else(|| Error::GameNotFound(guild_id.to_string()))
    }

    /// Header message id of the player's thread
    pub fn get_header(&self, guild_id: &str, player_id: &str) -> Result<String> {
        self.with_player(guild_id, player_id, |player| player.header_id.clone())
    }

    /// Thread id created for the player
    pub fn get_thread(&self, guild_id: &str, player_id: &str) -> Result<String> {
        self.with_player(guild_id, player_id, |player| player.thread_id.clone())
    }

    /// Record a player's declared decision, returning the previous one
    pub fn set_player_status(
        &self,
        guild_id: &str,
        player_id: &str,
        status: PlayerStatus,
    ) -> Result<PlayerStatus> {
        let mut game = self
            .games
            .get_mut(guild_id)
            .ok_or_else(|| Error::GameNotFound(guild_id.to_string()))?;
        let player = game
            .players
            .get_mut(player_id)
            .ok_or_else(|| Error::PlayerNotFound {
                guild_id: guild_id.to_string(),
                player_id: player_id.to_string(),
            })?;

        let previous = std::mem::replace(&mut player.status, status);
        debug!(
            "Player {} in guild {}: {:?} -> {:?}",
            player_id, guild_id, previous, status
        );
        Ok(previous)
    }

    pub fn set_game_status(&self, guild_id: &str, status: GameStatus) -> Result<()> {
        let mut game = self
            .games
            .get_mut(guild_id)
            .ok_or_else(|| Error::GameNotFound(guild_id.to_string()))?;
        game.status = status;
        Ok(())
    }

    /// Remove the guild's table
    pub fn end_game(&self, guild_id: &str) -> Option<Game> {
        let removed = self.games.remove(guild_id).map(|(_, game)| game);
        if removed.is_some() {
            info!("Closed table in guild {}", guild_id);
        }
        removed
    }

    /// Take a player off the guild's table, closing the table once it is empty
    pub fn vacate_seat(&self, guild_id: &str, player_id: &str) -> Option<Player> {
        let Entry::Occupied(mut slot) = self.games.entry(guild_id.to_string()) else {
            return None;
        };

        let player = slot.get_mut().players.remove(player_id)?;
        if slot.get().players.is_empty() {
            slot.remove();
            info!("Closed empty table in guild {}", guild_id);
        } else {
            debug!("{} left the table in guild {}", player_id, guild_id);
        }
        Some(player)
    }

    /// Number of running tables
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn with_player<T>(
        &self,
        guild_id: &str,
        player_id: &str,
        f: impl FnOnce(&Player) -> T,
    ) -> Result<T> {
        let game = self
            .games
            .get(guild_id)
            .ok_or_else(|| Error::GameNotFound(guild_id.to_string()))?;
        game.players
            .get(player_id)
            .map(f)
            .ok_or_else(|| Error::PlayerNotFound {
                guild_id: guild_id.to_string(),
                player_id: player_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_new_game() {
        let registry = SessionRegistry::new();
        assert!(!registry.guild_has_game("g1"));

        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();

        assert!(registry.guild_has_game("g1"));
        assert!(registry.game_has_player("g1", "p1"));
        assert_eq!(registry.game_count(), 1);
    }

    #[test]
    fn test_add_new_game_twice_keeps_first_table() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();

        let err = registry.add_new_game("g1", "t2", "h2", "p2").unwrap_err();
        assert!(matches!(err, Error::GameAlreadyExists(ref g) if g == "g1"));

        assert!(registry.game_has_player("g1", "p1"));
        assert!(!registry.game_has_player("g1", "p2"));
    }

    #[test]
    fn test_add_player_round_trips_thread_and_header() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        registry.add_player("g1", "p2", "t2", "h2").unwrap();

        assert!(registry.game_has_player("g1", "p2"));
        assert_eq!(registry.get_thread("g1", "p2").unwrap(), "t2");
        assert_eq!(registry.get_header("g1", "p2").unwrap(), "h2");
    }

    #[test]
    fn test_add_player_without_game() {
        let registry = SessionRegistry::new();

        let err = registry.add_player("g1", "p1", "t1", "h1").unwrap_err();
        assert!(matches!(err, Error::GameNotFound(ref g) if g == "g1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_player_twice_does_not_overwrite() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();

        let err = registry.add_player("g1", "p1", "t9", "h9").unwrap_err();
        assert!(matches!(err, Error::AlreadyJoined { .. }));
        assert_eq!(registry.get_thread("g1", "p1").unwrap(), "t1");
    }

    #[test]
    fn test_lookups_on_missing_keys() {
        let registry = SessionRegistry::new();
        assert!(!registry.game_has_player("nowhere", "p1"));
        assert!(registry.get_game("nowhere").is_none());
        assert!(matches!(
            registry.get_players("nowhere"),
            Err(Error::GameNotFound(_))
        ));
        assert!(matches!(
            registry.get_header("nowhere", "p1"),
            Err(Error::GameNotFound(_))
        ));

        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        assert!(matches!(
            registry.get_thread("g1", "ghost"),
            Err(Error::PlayerNotFound { .. })
        ));
    }

    #[test]
    fn test_get_players_scenario() {
        let registry = SessionRegistry::new();
        registry.add_new_game("G1", "T1", "H1", "P1").unwrap();

        let players = registry.get_players("G1").unwrap();
        assert_eq!(players.len(), 1);
        let p1 = &players["P1"];
        assert_eq!(p1.thread_id, "T1");
        assert_eq!(p1.header_id, "H1");
        assert_eq!(p1.status, PlayerStatus::Deciding);
    }

    #[test]
    fn test_seat_player_opens_then_joins() {
        let registry = SessionRegistry::new();

        assert_eq!(
            registry.seat_player("g1", "p1", "t1", "h1").unwrap(),
            Seating::OpenedTable
        );
        assert_eq!(
            registry.seat_player("g1", "p2", "t2", "h2").unwrap(),
            Seating::Joined
        );
        assert!(matches!(
            registry.seat_player("g1", "p2", "t3", "h3"),
            Err(Error::AlreadyJoined { .. })
        ));
        assert_eq!(registry.get_players("g1").unwrap().len(), 2);
    }

    #[test]
    fn test_set_player_status() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();

        let previous = registry
            .set_player_status("g1", "p1", PlayerStatus::Stand)
            .unwrap();
        assert_eq!(previous, PlayerStatus::Deciding);
        assert_eq!(
            registry.get_players("g1").unwrap()["p1"].status,
            PlayerStatus::Stand
        );

        assert!(matches!(
            registry.set_player_status("g1", "p2", PlayerStatus::Hit),
            Err(Error::PlayerNotFound { .. })
        ));
    }

    #[test]
    fn test_set_game_status_and_end_game() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        registry.set_game_status("g1", GameStatus::Waiting).unwrap();
        assert_eq!(registry.get_game("g1").unwrap().status, GameStatus::Waiting);

        let ended = registry.end_game("g1").unwrap();
        assert!(ended.has_player("p1"));
        assert!(!registry.guild_has_game("g1"));
        assert!(registry.end_game("g1").is_none());
        assert!(matches!(
            registry.set_game_status("g1", GameStatus::Dealing),
            Err(Error::GameNotFound(_))
        ));
    }

    #[test]
    fn test_vacate_seat_keeps_table_for_others() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        registry.add_player("g1", "p2", "t2", "h2").unwrap();

        let vacated = registry.vacate_seat("g1", "p2").unwrap();
        assert_eq!(vacated.thread_id, "t2");
        assert!(!registry.game_has_player("g1", "p2"));
        assert!(registry.game_has_player("g1", "p1"));

        // the seat is free again
        assert_eq!(
            registry.seat_player("g1", "p2", "t3", "h3").unwrap(),
            Seating::Joined
        );
    }

    #[test]
    fn test_vacate_last_seat_closes_table() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();

        assert!(registry.vacate_seat("g1", "p1").is_some());
        assert!(!registry.guild_has_game("g1"));
        assert!(registry.vacate_seat("g1", "p1").is_none());
        assert!(registry.vacate_seat("nowhere", "p1").is_none());

        assert_eq!(
            registry.seat_player("g1", "p1", "t2", "h2").unwrap(),
            Seating::OpenedTable
        );
    }

    #[test]
    fn test_guilds_are_independent() {
        let registry = SessionRegistry::new();
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        registry.add_new_game("g2", "t2", "h2", "p1").unwrap();

        assert_eq!(registry.get_thread("g1", "p1").unwrap(), "t1");
        assert_eq!(registry.get_thread("g2", "p1").unwrap(), "t2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_player_loses_no_updates() {
        let registry = Arc::new(SessionRegistry::new());
        registry.add_new_game("g1", "t0", "h0", "p0").unwrap();

        let mut handles = Vec::new();
        for i in 1..=64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.add_player(
                    "g1",
                    &format!("p{i}"),
                    &format!("t{i}"),
                    &format!("h{i}"),
                )
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let players = registry.get_players("g1").unwrap();
        assert_eq!(players.len(), 65);
        assert_eq!(players["p42"].thread_id, "t42");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_seat_player_opens_one_table() {
        let registry = Arc::new(SessionRegistry::new());

        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.seat_player("g1", &format!("p{i}"), "t", "h").unwrap()
            }));
        }

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap() == Seating::OpenedTable {
                opened += 1;
            }
        }

        assert_eq!(opened, 1);
        assert_eq!(registry.get_players("g1").unwrap().len(), 32);
    }
}
