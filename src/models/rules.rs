//! Scoring rules: per-tournament configuration, presets, and sport defaults.

use crate::models::tournament::TournamentError;
use serde::{Deserialize, Serialize};

/// How a match is scored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Each set won independently; majority of sets wins (badminton, volleyball).
    #[default]
    Sets,
    /// Points summed over a fixed number of sets (basketball quarters).
    Cumulative,
}

/// Deciding-set rule (sets mode only).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tiebreaker {
    pub score_to_win: u32,
}

/// Immutable per-tournament rule configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub scoring_mode: ScoringMode,
    /// Target per set (advisory in cumulative mode).
    pub score_to_win: u32,
    /// Sets needed to take the match (unused in cumulative mode).
    pub sets_to_win: u32,
    /// Maximum sets (sets mode) or fixed sets before totals are compared (cumulative).
    pub total_sets: u32,
    /// Cumulative only: play extra sets while totals are tied.
    pub allow_overtime: bool,
    pub tiebreaker: Option<Tiebreaker>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::best_of(3, 21)
    }
}

impl RuleConfig {
    /// Sets mode, best of `total_sets`, no tiebreaker.
    pub fn best_of(total_sets: u32, score_to_win: u32) -> Self {
        Self {
            scoring_mode: ScoringMode::Sets,
            score_to_win,
            sets_to_win: total_sets / 2 + 1,
            total_sets,
            allow_overtime: false,
            tiebreaker: None,
        }
    }

    /// Cumulative mode over `total_sets` fixed sets.
    pub fn cumulative(total_sets: u32, score_to_win: u32, allow_overtime: bool) -> Self {
        Self {
            scoring_mode: ScoringMode::Cumulative,
            score_to_win,
            sets_to_win: 0,
            total_sets,
            allow_overtime,
            tiebreaker: None,
        }
    }

    pub fn with_tiebreaker(mut self, score_to_win: u32) -> Self {
        self.tiebreaker = Some(Tiebreaker { score_to_win });
        self
    }

    /// Preset by id: `single`, `bo3`, `bo5`, `bo7`, `fixed4`.
    /// Sets presets keep `score_to_win` as given.
    pub fn preset(id: &str, score_to_win: u32) -> Option<Self> {
        match id {
            "single" => Some(Self::best_of(1, score_to_win)),
            "bo3" => Some(Self::best_of(3, score_to_win)),
            "bo5" => Some(Self::best_of(5, score_to_win)),
            "bo7" => Some(Self::best_of(7, score_to_win)),
            "fixed4" => Some(Self::cumulative(4, score_to_win, true)),
            _ => None,
        }
    }

    /// Default rules for a known sport id.
    pub fn for_sport(sport_id: &str) -> Option<Self> {
        match sport_id {
            "badminton" => Some(Self::best_of(3, 21).with_tiebreaker(21)),
            "basketball" => Some(Self::best_of(1, 6)),
            "table_tennis" => Some(Self::best_of(3, 11)),
            "pickleball" => Some(Self::best_of(1, 11)),
            "volleyball" => Some(Self::best_of(3, 25).with_tiebreaker(15)),
            _ => None,
        }
    }

    /// Reject configurations no match could finish under.
    pub fn validate(&self) -> Result<(), TournamentError> {
        if self.total_sets == 0 {
            return Err(TournamentError::InvalidRules("total sets must be at least 1".into()));
        }
        match self.scoring_mode {
            ScoringMode::Sets => {
                if self.score_to_win == 0 {
                    return Err(TournamentError::InvalidRules("score to win must be at least 1".into()));
                }
                if self.sets_to_win == 0 || self.sets_to_win > self.total_sets {
                    return Err(TournamentError::InvalidRules(format!(
                        "sets to win must be between 1 and {}",
                        self.total_sets
                    )));
                }
                if self.tiebreaker.is_some_and(|t| t.score_to_win == 0) {
                    return Err(TournamentError::InvalidRules(
                        "tiebreaker score to win must be at least 1".into(),
                    ));
                }
            }
            ScoringMode::Cumulative => {}
        }
        Ok(())
    }

    /// Short human label, e.g. "Best of 3" or "4 sets (total points)".
    pub fn format_label(&self) -> String {
        match self.scoring_mode {
            ScoringMode::Cumulative => format!("{} sets (total points)", self.total_sets),
            ScoringMode::Sets if self.sets_to_win <= 1 => "Single set".to_string(),
            ScoringMode::Sets => format!("Best of {}", self.sets_to_win * 2 - 1),
        }
    }
}
