//! Match records: set scores, sides, status, and the bracket-facing view.

use crate::models::player::PlayerRef;
use serde::{Deserialize, Serialize};

/// Slot id within a topology (e.g. `r2m1`), also the match id.
pub type MatchId = String;

/// One side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Player1 => Side::Player2,
            Side::Player2 => Side::Player1,
        }
    }
}

/// Points for both sides in one set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    pub p1_score: u32,
    pub p2_score: u32,
}

impl SetScore {
    pub fn new(p1_score: u32, p2_score: u32) -> Self {
        Self { p1_score, p2_score }
    }

    /// Side that strictly outscored the other, if any.
    pub fn leader(&self) -> Option<Side> {
        use std::cmp::Ordering::*;
        match self.p1_score.cmp(&self.p2_score) {
            Greater => Some(Side::Player1),
            Less => Some(Side::Player2),
            Equal => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.p1_score == 0 && self.p2_score == 0
    }
}

/// Lifecycle of a match.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    Live,
    Completed,
}

/// A match record; one per topology slot for the whole tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub match_id: MatchId,
    pub tournament_id: String,
    pub next_match_id: Option<MatchId>,
    pub player1: Option<PlayerRef>,
    pub player2: Option<PlayerRef>,
    #[serde(default)]
    pub sets: Vec<SetScore>,
    #[serde(default)]
    pub current_set: usize,
    pub status: MatchStatus,
    /// Winner's name; only set once completed.
    pub winner: Option<String>,
}

impl Match {
    /// An empty pending shell.
    pub fn new(
        match_id: impl Into<MatchId>,
        tournament_id: impl Into<String>,
        next_match_id: Option<MatchId>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            tournament_id: tournament_id.into(),
            next_match_id,
            player1: None,
            player2: None,
            sets: Vec::new(),
            current_set: 0,
            status: MatchStatus::Pending,
            winner: None,
        }
    }

    pub fn player(&self, side: Side) -> Option<&PlayerRef> {
        match side {
            Side::Player1 => self.player1.as_ref(),
            Side::Player2 => self.player2.as_ref(),
        }
    }

    pub fn player_mut(&mut self, side: Side) -> &mut Option<PlayerRef> {
        match side {
            Side::Player1 => &mut self.player1,
            Side::Player2 => &mut self.player2,
        }
    }

    /// Which side `name` occupies, if any.
    pub fn side_of(&self, name: &str) -> Option<Side> {
        [Side::Player1, Side::Player2]
            .into_iter()
            .find(|&s| self.player(s).is_some_and(|p| p.name == name))
    }

    pub fn has_both_players(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// Neither side assigned.
    pub fn is_vacuous(&self) -> bool {
        self.player1.is_none() && self.player2.is_none()
    }

    /// The only assigned side when exactly one is present.
    pub fn lone_player(&self) -> Option<Side> {
        match (&self.player1, &self.player2) {
            (Some(_), None) => Some(Side::Player1),
            (None, Some(_)) => Some(Side::Player2),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Opponent of the named player (the runner-up when `name` won).
    pub fn opponent_of(&self, name: &str) -> Option<&PlayerRef> {
        self.side_of(name).and_then(|s| self.player(s.other()))
    }
}

/// What a bracket slot currently shows.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchView {
    /// Nobody assigned yet (or ever, for a dead branch).
    Unscheduled { match_id: MatchId },
    /// One side known; waiting for the other feeder.
    AwaitingPlayers {
        match_id: MatchId,
        player: PlayerRef,
        side: Side,
    },
    /// Both players known, or already decided.
    Scheduled(Match),
}

impl MatchView {
    pub fn of(m: &Match) -> Self {
        if m.is_completed() || m.has_both_players() {
            return MatchView::Scheduled(m.clone());
        }
        let match_id = m.match_id.clone();
        match (&m.player1, &m.player2) {
            (Some(p), None) => MatchView::AwaitingPlayers {
                match_id,
                player: p.clone(),
                side: Side::Player1,
            },
            (None, Some(p)) => MatchView::AwaitingPlayers {
                match_id,
                player: p.clone(),
                side: Side::Player2,
            },
            _ => MatchView::Unscheduled { match_id },
        }
    }
}
