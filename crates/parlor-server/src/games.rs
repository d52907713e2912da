//! Live game registry.
//!
//! Games are keyed by their id, which doubles as the name of the room the
//! game's traffic flows through. Records are created lazily by the first
//! state push for a non-lobby room and removed by the expiry event an
//! hour after completion; nothing else destroys them.

use std::collections::HashMap;

use parlor_core::{Environment, Game};

/// Registry of live games keyed by game id.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: HashMap<String, Game>,
}

impl GameRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a live game exists for the id.
    #[must_use]
    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    /// Game for the id, if live.
    #[must_use]
    pub fn get(&self, game_id: &str) -> Option<&Game> {
        self.games.get(game_id)
    }

    /// Mutable game for the id, if live.
    pub fn get_mut(&mut self, game_id: &str) -> Option<&mut Game> {
        self.games.get_mut(game_id)
    }

    /// Game for the id, creating a fresh one if none is live.
    pub fn get_or_create(&mut self, game_id: &str, now_ms: u64) -> &mut Game {
        self.games.entry(game_id.to_string()).or_insert_with(|| Game::new(now_ms))
    }

    /// Remove a game record. Idempotent: `false` if already gone.
    pub fn remove(&mut self, game_id: &str) -> bool {
        self.games.remove(game_id).is_some()
    }

    /// Number of live games.
    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// True when no games are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Mint a short random game id, unique among live games.
    ///
    /// Tokens are lowercase hex in `1..=0x100000` (at most six digits),
    /// re-rolled on collision with a live game.
    pub fn mint_id(&self, env: &impl Environment) -> String {
        loop {
            let token = format!("{:x}", env.random_u64() % 0x10_0000 + 1);
            if !self.contains(&token) {
                return token;
            }
        }
    }
}
