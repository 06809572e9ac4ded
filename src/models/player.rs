//! Registered players and the lightweight references matches hold to them.

use serde::{Deserialize, Serialize};

/// A registered player. Names are unique within a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    /// Registration order; round-one slots index into this.
    pub index: usize,
    /// Account id when the player registered while signed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Player {
    /// Create a player at the given registration index.
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            user_id: None,
        }
    }

    /// Attach an account id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Reference to this player as seeded from a round-one slot.
    pub fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            name: self.name.clone(),
            source: Some(PlayerSource::Registrant(self.index)),
        }
    }
}

/// Where a player in a match slot came from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerSource {
    /// Registrant index (round one).
    Registrant(usize),
    /// Id of the match whose winner this is.
    Match(String),
}

/// A player as seen from a match slot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PlayerSource>,
}

impl PlayerRef {
    /// A reference carrying only a name (KOTH challengers, manual entries).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    /// Same player, re-sourced as the winner of `match_id`.
    pub fn advanced_from(&self, match_id: &str) -> Self {
        Self {
            name: self.name.clone(),
            source: Some(PlayerSource::Match(match_id.to_string())),
        }
    }
}
