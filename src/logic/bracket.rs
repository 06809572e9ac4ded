//! Bracket assembly: turn a topology and the registrant list into match records.

use crate::models::{BracketTopology, Match, MatchId, MatchView, Player, Side, Stage};
use serde::Serialize;
use std::collections::BTreeMap;

/// Create one pending match per slot. Round-one slots take their players
/// from `players[source]`; an index past the end leaves that side empty
/// (a structural bye). Later rounds start empty.
///
/// Byes are not resolved here; run the initialization pass afterwards.
pub fn assemble(
    tournament_id: &str,
    topology: &BracketTopology,
    players: &[Player],
) -> BTreeMap<MatchId, Match> {
    let mut matches = BTreeMap::new();
    for slot in topology.slots() {
        let mut m = Match::new(slot.id.clone(), tournament_id, slot.next.clone());
        for side in [Side::Player1, Side::Player2] {
            if let Some(source) = slot.source(side) {
                *m.player_mut(side) = players.get(source).map(Player::to_ref);
            }
        }
        matches.insert(slot.id.clone(), m);
    }
    log::debug!(
        "Assembled {} matches for {} players on {}",
        matches.len(),
        players.len(),
        topology.id
    );
    matches
}

/// Both players are known, so scoring can begin.
pub fn can_match_start(m: &Match) -> bool {
    m.has_both_players()
}

/// One stage of the bracket as displayed.
#[derive(Clone, Debug, Serialize)]
pub struct StageView {
    pub round: u32,
    pub name: String,
    pub matches: Vec<MatchView>,
}

/// Every slot of the topology as a [`MatchView`], grouped by stage. Slots
/// with no stored match show as unscheduled.
pub fn bracket_view(topology: &BracketTopology, matches: &BTreeMap<MatchId, Match>) -> Vec<StageView> {
    topology.stages.iter().map(|stage| stage_view(stage, matches)).collect()
}

fn stage_view(stage: &Stage, matches: &BTreeMap<MatchId, Match>) -> StageView {
    StageView {
        round: stage.round,
        name: stage.name.clone(),
        matches: stage
            .slots
            .iter()
            .map(|slot| match matches.get(&slot.id) {
                Some(m) => MatchView::of(m),
                None => MatchView::Unscheduled {
                    match_id: slot.id.clone(),
                },
            })
            .collect(),
    }
}
