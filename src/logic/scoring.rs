//! Scoring rules over a match's recorded sets.
//!
//! Everything here is a pure function of `(sets, rule, cursor)`: callers
//! re-derive match state from persisted data alone, so a retried or
//! recovered update computes exactly what the first attempt did.
//!
//! `cursor` is the index of the set currently in play. When given, that set
//! is treated as unfinished and left out of set counts and totals.

use crate::models::{RuleConfig, ScoringMode, SetScore, Side};
use serde::Serialize;

/// A per-side count (sets won, or points). Wider than a set score so
/// summing many sets cannot overflow.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Tally {
    pub p1: u64,
    pub p2: u64,
}

impl Tally {
    pub fn get(&self, side: Side) -> u64 {
        match side {
            Side::Player1 => self.p1,
            Side::Player2 => self.p2,
        }
    }

    /// Side with the strictly higher count.
    pub fn leader(&self) -> Option<Side> {
        use std::cmp::Ordering::*;
        match self.p1.cmp(&self.p2) {
            Greater => Some(Side::Player1),
            Less => Some(Side::Player2),
            Equal => None,
        }
    }
}

/// Where a match stands under its rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "state", content = "winner", rename_all = "snake_case")]
pub enum MatchOutcome {
    InProgress,
    Decided(Side),
    /// Cumulative totals level after the fixed sets with overtime disabled.
    /// Terminal for the engine; an organizer has to settle it.
    UndecidedTie,
}

/// Points summed across all given sets.
pub fn cumulative_score(sets: &[SetScore]) -> Tally {
    sets.iter().fold(Tally::default(), |acc, s| Tally {
        p1: acc.p1 + u64::from(s.p1_score),
        p2: acc.p2 + u64::from(s.p2_score),
    })
}

/// Sets each side won, skipping `exclude` (the set in play). A level set
/// counts for neither side.
pub fn sets_won(sets: &[SetScore], exclude: Option<usize>) -> Tally {
    let mut tally = Tally::default();
    for (i, set) in sets.iter().enumerate() {
        if Some(i) == exclude {
            continue;
        }
        match set.leader() {
            Some(Side::Player1) => tally.p1 += 1,
            Some(Side::Player2) => tally.p2 += 1,
            None => {}
        }
    }
    tally
}

/// The set in play is a deciding set: both sides one set short of the match
/// and a tiebreaker rule is configured (sets mode only).
pub fn is_tiebreaker_set(sets: &[SetScore], rule: &RuleConfig, cursor: Option<usize>) -> bool {
    if rule.scoring_mode != ScoringMode::Sets || rule.tiebreaker.is_none() {
        return false;
    }
    let won = sets_won(sets, cursor);
    let needed = u64::from(rule.sets_to_win.saturating_sub(1));
    won.p1 == needed && won.p2 == needed
}

/// Target score for the set in play.
pub fn current_set_target(sets: &[SetScore], rule: &RuleConfig, cursor: Option<usize>) -> u32 {
    match rule.tiebreaker {
        Some(tb) if is_tiebreaker_set(sets, rule, cursor) => tb.score_to_win,
        _ => rule.score_to_win,
    }
}

/// A set is over once someone reaches `target` with a two-point lead.
pub fn set_reaches_target(p1: u32, p2: u32, target: u32) -> bool {
    p1.max(p2) >= target && p1.abs_diff(p2) >= 2
}

/// [`set_reaches_target`] against the rule's regular set target.
pub fn is_set_complete(p1: u32, p2: u32, rule: &RuleConfig) -> bool {
    set_reaches_target(p1, p2, rule.score_to_win)
}

/// Cumulative mode: the set at `cursor` is past the fixed sets.
pub fn is_in_overtime(rule: &RuleConfig, cursor: usize) -> bool {
    rule.scoring_mode == ScoringMode::Cumulative && cursor >= rule.total_sets as usize
}

/// Full standing of the match.
pub fn match_outcome(sets: &[SetScore], rule: &RuleConfig, cursor: Option<usize>) -> MatchOutcome {
    match rule.scoring_mode {
        ScoringMode::Sets => {
            let won = sets_won(sets, cursor);
            let needed = u64::from(rule.sets_to_win);
            if won.p1 >= needed || won.p2 >= needed {
                match won.leader() {
                    Some(side) => MatchOutcome::Decided(side),
                    // only reachable with sets_to_win == 0
                    None => MatchOutcome::InProgress,
                }
            } else {
                MatchOutcome::InProgress
            }
        }
        ScoringMode::Cumulative => {
            let played = completed_sets(sets, cursor);
            if played.len() < rule.total_sets as usize {
                return MatchOutcome::InProgress;
            }
            match cumulative_score(played).leader() {
                Some(side) => MatchOutcome::Decided(side),
                None if rule.allow_overtime => MatchOutcome::InProgress,
                None => MatchOutcome::UndecidedTie,
            }
        }
    }
}

/// Sets mode: someone has `sets_to_win` sets. Cumulative mode: the fixed
/// sets are played and the totals differ. A level cumulative total is never
/// complete; see [`match_outcome`] for telling overtime from an undecided tie.
pub fn is_match_complete(sets: &[SetScore], rule: &RuleConfig, cursor: Option<usize>) -> bool {
    matches!(match_outcome(sets, rule, cursor), MatchOutcome::Decided(_))
}

/// Winner over all recorded sets, if the match is decided.
pub fn match_winner(sets: &[SetScore], rule: &RuleConfig) -> Option<Side> {
    match match_outcome(sets, rule, None) {
        MatchOutcome::Decided(side) => Some(side),
        _ => None,
    }
}

/// Every set either still short of the target or properly finished.
pub fn validate_scores(sets: &[SetScore], rule: &RuleConfig) -> bool {
    if rule.scoring_mode == ScoringMode::Cumulative {
        return true;
    }
    sets.iter().enumerate().all(|(i, set)| {
        let target = current_set_target(&sets[..i], rule, None);
        let reached = set.p1_score >= target || set.p2_score >= target;
        !reached || set_reaches_target(set.p1_score, set.p2_score, target)
    })
}

/// "21-19, 18-21, 21-16", or "-" before any set.
pub fn format_score(sets: &[SetScore]) -> String {
    if sets.is_empty() {
        return "-".to_string();
    }
    sets.iter()
        .map(|s| format!("{}-{}", s.p1_score, s.p2_score))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sets won so far, e.g. "2-1".
pub fn format_set_score(sets: &[SetScore], cursor: Option<usize>) -> String {
    let won = sets_won(sets, cursor);
    format!("{}-{}", won.p1, won.p2)
}

/// Display name of the set at `cursor`: "Set 2", or "Overtime 1" past the fixed sets.
pub fn current_set_name(rule: &RuleConfig, cursor: usize) -> String {
    if is_in_overtime(rule, cursor) {
        format!("Overtime {}", cursor - rule.total_sets as usize + 1)
    } else {
        format!("Set {}", cursor + 1)
    }
}

fn completed_sets(sets: &[SetScore], cursor: Option<usize>) -> &[SetScore] {
    match cursor {
        Some(c) => &sets[..c.min(sets.len())],
        None => sets,
    }
}
