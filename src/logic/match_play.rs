//! Score entry for a single match: points, closing sets, confirming the winner.
//!
//! The `Match`-level functions are pure state updates; the store-level
//! wrappers read the match, apply the update, and write it back as a
//! compare-and-set on the set array so two scorers on one match cannot
//! silently overwrite each other.

use crate::logic::progression::{self, ProgressEvent, ProgressMode};
use crate::logic::scoring::{
    self, cumulative_score, current_set_target, match_outcome, set_reaches_target, MatchOutcome,
};
use crate::models::{
    Match, MatchStatus, RuleConfig, ScoringMode, SetScore, Side, Tournament, TournamentError,
    TournamentId, TournamentStatus,
};
use crate::store::TournamentStore;
use serde::Serialize;

/// What closing the current set led to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SetEnd {
    /// A new regular set was opened.
    NextSet { current_set: usize },
    /// Totals are level after the fixed sets; an overtime set was opened.
    Overtime { current_set: usize, overtime: usize },
    /// The match is decided; confirm it to advance the winner.
    MatchDecided { winner: Side },
    /// Totals are level and overtime is off; needs an organizer decision.
    UndecidedTie,
}

/// Highest score a side can hold in one set.
pub const MAX_SET_SCORE: u32 = 9_999;

/// Add `delta` points (may be negative) to `side` in the set in play; the
/// score stays within `0..=MAX_SET_SCORE`. Opens the first set if none
/// exists and marks the match live.
pub fn adjust_score(m: &mut Match, side: Side, delta: i32) -> Result<(), TournamentError> {
    if m.is_completed() {
        return Err(TournamentError::InvalidState);
    }
    if !m.has_both_players() {
        return Err(TournamentError::PreconditionFailed(format!(
            "{} is still waiting for players",
            m.match_id
        )));
    }
    if m.sets.is_empty() {
        m.sets.push(SetScore::default());
        m.current_set = 0;
    }
    let cursor = m.current_set;
    let set = m.sets.get_mut(cursor).ok_or_else(|| {
        TournamentError::PreconditionFailed(format!("{} has no set in play", m.match_id))
    })?;
    let score = match side {
        Side::Player1 => &mut set.p1_score,
        Side::Player2 => &mut set.p2_score,
    };
    *score = score.saturating_add_signed(delta).min(MAX_SET_SCORE);
    m.status = MatchStatus::Live;
    Ok(())
}

/// Close the set in play.
///
/// Sets mode requires the set's target (the tiebreaker target in a deciding
/// set) with a two-point lead. Cumulative mode accepts any set with points
/// on the board. Play continues in a fresh set unless the match is decided
/// or stuck on an undecided tie, in which case the cursor moves one past the
/// last set.
pub fn end_current_set(m: &mut Match, rule: &RuleConfig) -> Result<SetEnd, TournamentError> {
    if m.is_completed() {
        return Err(TournamentError::InvalidState);
    }
    let cursor = m.current_set;
    let Some(set) = m.sets.get(cursor).copied() else {
        return Err(TournamentError::PreconditionFailed("no set in play".into()));
    };
    if set.is_blank() {
        return Err(TournamentError::PreconditionFailed("no points scored in this set".into()));
    }

    match rule.scoring_mode {
        ScoringMode::Sets => {
            let target = current_set_target(&m.sets, rule, Some(cursor));
            if !set_reaches_target(set.p1_score, set.p2_score, target) {
                return Err(TournamentError::PreconditionFailed(format!(
                    "set needs {} points with a two-point lead (at {}-{})",
                    target, set.p1_score, set.p2_score
                )));
            }
            if let MatchOutcome::Decided(winner) = match_outcome(&m.sets, rule, None) {
                m.current_set = m.sets.len();
                return Ok(SetEnd::MatchDecided { winner });
            }
            Ok(SetEnd::NextSet {
                current_set: open_set(m),
            })
        }
        ScoringMode::Cumulative => {
            let fixed = rule.total_sets as usize;
            if m.sets.len() < fixed {
                return Ok(SetEnd::NextSet {
                    current_set: open_set(m),
                });
            }
            match cumulative_score(&m.sets).leader() {
                Some(winner) => {
                    m.current_set = m.sets.len();
                    Ok(SetEnd::MatchDecided { winner })
                }
                None if rule.allow_overtime => {
                    let current_set = open_set(m);
                    Ok(SetEnd::Overtime {
                        current_set,
                        overtime: current_set - fixed + 1,
                    })
                }
                None => {
                    m.current_set = m.sets.len();
                    Ok(SetEnd::UndecidedTie)
                }
            }
        }
    }
}

fn open_set(m: &mut Match) -> usize {
    m.sets.push(SetScore::default());
    m.current_set = m.sets.len() - 1;
    m.current_set
}

/// Winner of `m` under `rule`, or why there is none yet.
pub fn decided_winner(m: &Match, rule: &RuleConfig) -> Result<Side, TournamentError> {
    match match_outcome(&m.sets, rule, None) {
        MatchOutcome::Decided(side) => Ok(side),
        MatchOutcome::UndecidedTie => Err(TournamentError::UndecidedTie),
        MatchOutcome::InProgress => Err(TournamentError::PreconditionFailed(format!(
            "{} is not complete ({})",
            m.match_id,
            scoring::format_score(&m.sets)
        ))),
    }
}

fn load_match<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    match_id: &str,
) -> Result<Match, TournamentError> {
    store
        .get_match(tournament_id, match_id)?
        .ok_or_else(|| TournamentError::NotFound(format!("match {}", match_id)))
}

fn require_live<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
) -> Result<Tournament, TournamentError> {
    let t = store.get_tournament(tournament_id)?;
    if t.status != TournamentStatus::Live {
        return Err(TournamentError::InvalidState);
    }
    Ok(t)
}

/// Record a point change on a stored match.
pub fn score_point<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    match_id: &str,
    side: Side,
    delta: i32,
) -> Result<Match, TournamentError> {
    require_live(store, tournament_id)?;
    let mut m = load_match(store, tournament_id, match_id)?;
    let before = m.sets.clone();
    adjust_score(&mut m, side, delta)?;
    store.put_match_if_unchanged(tournament_id, &before, m.clone())?;
    Ok(m)
}

/// Close the set in play on a stored match.
pub fn end_set<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    match_id: &str,
) -> Result<(SetEnd, Match), TournamentError> {
    let t = require_live(store, tournament_id)?;
    let mut m = load_match(store, tournament_id, match_id)?;
    let before = m.sets.clone();
    let end = end_current_set(&mut m, &t.config.rules)?;
    store.put_match_if_unchanged(tournament_id, &before, m.clone())?;
    log::debug!("{}: set closed, {:?}", match_id, end);
    Ok((end, m))
}

/// Scorer confirms the end of a match: check it is decided, mark it
/// completed, then advance the winner (knockout) or rotate the court (KOTH).
///
/// Confirming an already completed knockout match re-runs the advancement
/// and the round sweep, which the guarded slot writes turn into a no-op;
/// this lets a caller recover from a failure after the match was stored.
pub fn confirm_match<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    match_id: &str,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    let t = store.get_tournament(tournament_id)?;
    let topology = store.get_topology(&t.config.format_id)?;
    let mut m = load_match(store, tournament_id, match_id)?;

    if m.is_completed() {
        if topology.is_koth() {
            return Err(TournamentError::InvalidState);
        }
        let winner = m
            .winner
            .as_deref()
            .and_then(|name| m.side_of(name))
            .and_then(|side| m.player(side).cloned())
            .ok_or_else(|| {
                TournamentError::IntegrityViolation(format!("{} completed without a winner", match_id))
            })?;
        let mut events =
            progression::advance_winner(store, tournament_id, match_id, &winner, &topology, ProgressMode::Live)?;
        events.extend(progression::check_round_completion(store, tournament_id, &m, &topology)?);
        return Ok(events);
    }

    if t.status != TournamentStatus::Live {
        return Err(TournamentError::InvalidState);
    }
    let side = decided_winner(&m, &t.config.rules)?;
    let winner = m.player(side).cloned().ok_or_else(|| {
        TournamentError::IntegrityViolation(format!("{} has no {:?}", match_id, side))
    })?;

    let before = m.sets.clone();
    m.status = MatchStatus::Completed;
    m.winner = Some(winner.name.clone());
    store.put_match_if_unchanged(tournament_id, &before, m.clone())?;
    log::info!("{} won {} ({})", winner.name, match_id, scoring::format_score(&m.sets));

    let mut events =
        progression::advance_winner(store, tournament_id, match_id, &winner, &topology, ProgressMode::Live)?;
    if !topology.is_koth() {
        events.extend(progression::check_round_completion(store, tournament_id, &m, &topology)?);
    }
    Ok(events)
}
