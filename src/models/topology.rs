//! Bracket topology: the static shape of a tournament format.
//!
//! A topology is an ordered list of stages. Each stage holds match slots; a
//! slot names its two feeders (a registrant index in round one, otherwise the
//! winners of earlier slots whose `next` points at it) and the slot its own
//! winner moves on to. Exactly one slot has no `next`: the final.

use crate::models::game::{MatchId, Side};
use crate::models::tournament::TournamentError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Id of the single slot used by king-of-the-hill formats.
pub const KOTH_MATCH_ID: &str = "koth_match";

/// Kind of format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    /// Single elimination.
    #[default]
    Knockout,
    /// King of the hill: one court, winner stays on.
    Koth,
}

/// One slot in a stage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MatchSlot {
    pub id: MatchId,
    pub next: Option<MatchId>,
    #[serde(default, alias = "p1Source", skip_serializing_if = "Option::is_none")]
    pub p1_source: Option<usize>,
    #[serde(default, alias = "p2Source", skip_serializing_if = "Option::is_none")]
    pub p2_source: Option<usize>,
}

impl MatchSlot {
    /// A round-one slot seeded from two registrant indices.
    pub fn seeded(id: impl Into<MatchId>, next: Option<MatchId>, p1: usize, p2: usize) -> Self {
        Self {
            id: id.into(),
            next,
            p1_source: Some(p1),
            p2_source: Some(p2),
        }
    }

    /// A later-round slot fed by progression.
    pub fn fed(id: impl Into<MatchId>, next: Option<MatchId>) -> Self {
        Self {
            id: id.into(),
            next,
            p1_source: None,
            p2_source: None,
        }
    }

    pub fn source(&self, side: Side) -> Option<usize> {
        match side {
            Side::Player1 => self.p1_source,
            Side::Player2 => self.p2_source,
        }
    }

    /// True when either side is seeded from the registrant list.
    pub fn is_seeded(&self) -> bool {
        self.p1_source.is_some() || self.p2_source.is_some()
    }
}

/// A round of the bracket.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub round: u32,
    pub name: String,
    #[serde(rename = "matches", alias = "slots")]
    pub slots: Vec<MatchSlot>,
}

/// Which earlier slots feed a given slot.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub p1_from: Option<MatchId>,
    pub p2_from: Option<MatchId>,
}

impl SourceMapping {
    /// Side of the target slot that `feeder` writes into.
    pub fn side_for(&self, feeder: &str) -> Option<Side> {
        if self.p1_from.as_deref() == Some(feeder) {
            Some(Side::Player1)
        } else if self.p2_from.as_deref() == Some(feeder) {
            Some(Side::Player2)
        } else {
            None
        }
    }

    pub fn feeder(&self, side: Side) -> Option<&str> {
        match side {
            Side::Player1 => self.p1_from.as_deref(),
            Side::Player2 => self.p2_from.as_deref(),
        }
    }
}

/// Reverse edges of a topology, keyed by target slot.
pub type SourceMap = HashMap<MatchId, SourceMapping>;

/// Static description of a tournament format.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketTopology {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub format_type: FormatType,
    /// Registration capacity; 0 means unlimited (KOTH).
    #[serde(default)]
    pub total_slots: usize,
    pub stages: Vec<Stage>,
}

impl BracketTopology {
    /// Single-elimination bracket for `total_slots` players (a power of two, at least 2).
    ///
    /// Slot ids are `r{round}m{n}`; round-one slot `n` seeds registrants
    /// `2(n-1)` and `2(n-1)+1`; slots `2j-1` and `2j` feed slot `j` of the next round.
    pub fn knockout(total_slots: usize) -> Result<Self, TournamentError> {
        if total_slots < 2 || !total_slots.is_power_of_two() {
            return Err(TournamentError::InvalidTopology(format!(
                "knockout size must be a power of two >= 2, got {}",
                total_slots
            )));
        }
        let rounds = total_slots.trailing_zeros();
        let mut stages = Vec::with_capacity(rounds as usize);
        for round in 1..=rounds {
            let count = total_slots >> round;
            let slots = (1..=count)
                .map(|n| {
                    let id = format!("r{}m{}", round, n);
                    let next = (round < rounds).then(|| format!("r{}m{}", round + 1, (n + 1) / 2));
                    if round == 1 {
                        MatchSlot::seeded(id, next, 2 * (n - 1), 2 * (n - 1) + 1)
                    } else {
                        MatchSlot::fed(id, next)
                    }
                })
                .collect();
            stages.push(Stage {
                round,
                name: knockout_stage_name(count),
                slots,
            });
        }
        Ok(Self {
            id: format!("ko_{}", total_slots),
            name: format!("{}-player single elimination", total_slots),
            format_type: FormatType::Knockout,
            total_slots,
            stages,
        })
    }

    /// King-of-the-hill: a single slot with no successor, unlimited registration.
    pub fn koth() -> Self {
        Self {
            id: "koth".to_string(),
            name: "King of the hill".to_string(),
            format_type: FormatType::Koth,
            total_slots: 0,
            stages: vec![Stage {
                round: 1,
                name: "On court".to_string(),
                slots: vec![MatchSlot::fed(KOTH_MATCH_ID, None)],
            }],
        }
    }

    /// Built-in formats: `koth` and `ko_N` for any power of two N >= 2.
    pub fn builtin(format_id: &str) -> Result<Self, TournamentError> {
        if format_id == "koth" {
            return Ok(Self::koth());
        }
        format_id
            .strip_prefix("ko_")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| Self::knockout(n).ok())
            .ok_or_else(|| TournamentError::UnknownFormat(format_id.to_string()))
    }

    pub fn is_koth(&self) -> bool {
        self.format_type == FormatType::Koth
    }

    /// All slots in declaration order.
    pub fn slots(&self) -> impl Iterator<Item = &MatchSlot> {
        self.stages.iter().flat_map(|s| s.slots.iter())
    }

    pub fn slot(&self, slot_id: &str) -> Option<&MatchSlot> {
        self.slots().find(|s| s.id == slot_id)
    }

    pub fn slot_count(&self) -> usize {
        self.stages.iter().map(|s| s.slots.len()).sum()
    }

    /// Index into `stages` of the stage holding `slot_id`.
    pub fn stage_index_of(&self, slot_id: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|s| s.slots.iter().any(|m| m.id == slot_id))
    }

    /// Stage holding `slot_id`.
    pub fn stage_of(&self, slot_id: &str) -> Result<&Stage, TournamentError> {
        self.stage_index_of(slot_id)
            .map(|i| &self.stages[i])
            .ok_or_else(|| TournamentError::NotFound(format!("slot {}", slot_id)))
    }

    /// Display name of the round `slot_id` belongs to.
    pub fn round_name(&self, slot_id: &str) -> Result<&str, TournamentError> {
        self.stage_of(slot_id).map(|s| s.name.as_str())
    }

    /// Reverse edges: for every slot that something feeds, which slot feeds
    /// `player1` and which feeds `player2`, in declaration order.
    ///
    /// A target with a single feeder gets only `p1_from`. Targets nobody
    /// feeds have no entry. Feeders beyond the second are ignored here and
    /// rejected by [`BracketTopology::validate`].
    pub fn reverse_source_map(&self) -> SourceMap {
        let mut map = SourceMap::new();
        for slot in self.slots() {
            let Some(next) = &slot.next else { continue };
            let entry = map.entry(next.clone()).or_default();
            if entry.p1_from.is_none() {
                entry.p1_from = Some(slot.id.clone());
            } else if entry.p2_from.is_none() {
                entry.p2_from = Some(slot.id.clone());
            }
        }
        map
    }

    /// Check the structural invariants: unique ids, forward-only `next`
    /// edges, a single terminal slot, at most two feeders per slot.
    pub fn validate(&self) -> Result<(), TournamentError> {
        let mut seen = HashSet::new();
        for slot in self.slots() {
            if !seen.insert(slot.id.as_str()) {
                return Err(TournamentError::InvalidTopology(format!("duplicate slot {}", slot.id)));
            }
        }

        let terminals = self.slots().filter(|s| s.next.is_none()).count();
        if terminals != 1 {
            return Err(TournamentError::InvalidTopology(format!(
                "expected exactly one final slot, found {}",
                terminals
            )));
        }

        let mut feeders: HashMap<&str, usize> = HashMap::new();
        for (stage_idx, stage) in self.stages.iter().enumerate() {
            for slot in &stage.slots {
                let Some(next) = slot.next.as_deref() else { continue };
                match self.stage_index_of(next) {
                    Some(target) if target > stage_idx => {}
                    Some(_) => {
                        return Err(TournamentError::InvalidTopology(format!(
                            "slot {} feeds {} which is not in a later stage",
                            slot.id, next
                        )))
                    }
                    None => {
                        return Err(TournamentError::InvalidTopology(format!(
                            "slot {} feeds unknown slot {}",
                            slot.id, next
                        )))
                    }
                }
                let count = feeders.entry(next).or_insert(0);
                *count += 1;
                if *count > 2 {
                    return Err(TournamentError::InvalidTopology(format!(
                        "slot {} has more than two feeders",
                        next
                    )));
                }
            }
        }
        Ok(())
    }
}

fn knockout_stage_name(slots_in_stage: usize) -> String {
    match slots_in_stage {
        1 => "Final".to_string(),
        2 => "Semifinals".to_string(),
        4 => "Quarterfinals".to_string(),
        n => format!("Round of {}", n * 2),
    }
}
