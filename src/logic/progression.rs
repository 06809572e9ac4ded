//! Winner progression and bye resolution for knockout brackets.
//!
//! Match states: `pending -> live -> completed`, plus `pending -> completed`
//! for a bye. A bye is a pending match holding exactly one player whose
//! other side can never be filled: that side is an unfilled round-one seed,
//! has no feeder at all, or is fed by a slot that is itself dead (empty on
//! both sides, each side dead). A side whose feeder is still undecided is
//! just waiting, not a bye.
//!
//! Advancing walks an explicit worklist rather than recursing: each completed
//! match pushes its winner into the next slot, and a next slot that turns
//! into a bye is completed and queued in turn. Every hop moves to a later
//! stage, so a chain is at most `stages.len()` hops long; longer chains mean
//! the topology has a cycle and are rejected.

use crate::logic::koth;
use crate::models::{
    BracketTopology, Match, MatchId, MatchStatus, PlayerRef, Side, SourceMap, TournamentError,
    TournamentId,
};
use crate::store::{SlotWrite, TournamentStore};
use serde::Serialize;
use std::collections::VecDeque;

/// How far a single advancement is driven.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    /// Bracket set-up: fill only the slot directly above; the initialization
    /// sweep visits later stages itself.
    Initialization,
    /// Real play: follow byes up the bracket until a slot needs a real match.
    Live,
}

/// Something progression did, in order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A match was completed without play.
    Bye { match_id: MatchId, player: String },
    /// A winner was written into (or was already in) the next slot.
    Advanced {
        from: MatchId,
        to: MatchId,
        side: Side,
        player: String,
    },
    /// The final was decided.
    Finished {
        champion: String,
        runner_up: Option<String>,
    },
    /// KOTH: incumbent stays on, next challenger called up.
    Rotated {
        incumbent: String,
        challenger: Option<String>,
    },
}

struct Progression<'a, S: TournamentStore + ?Sized> {
    store: &'a S,
    tournament_id: TournamentId,
    topology: &'a BracketTopology,
    sources: SourceMap,
}

impl<'a, S: TournamentStore + ?Sized> Progression<'a, S> {
    fn new(store: &'a S, tournament_id: TournamentId, topology: &'a BracketTopology) -> Self {
        Self {
            store,
            tournament_id,
            topology,
            sources: topology.reverse_source_map(),
        }
    }

    fn max_hops(&self) -> usize {
        self.topology.stages.len()
    }

    fn load(&self, match_id: &str) -> Result<Match, TournamentError> {
        self.store
            .get_match(self.tournament_id, match_id)?
            .ok_or_else(|| TournamentError::NotFound(format!("match {}", match_id)))
    }

    /// `side` of `m` is empty and nothing will ever fill it.
    fn side_is_dead(&self, m: &Match, side: Side, depth: usize) -> Result<bool, TournamentError> {
        if m.player(side).is_some() {
            return Ok(false);
        }
        if depth > self.max_hops() {
            return Err(TournamentError::IntegrityViolation(format!(
                "feeder chain of {} is longer than the bracket; topology has a cycle",
                m.match_id
            )));
        }
        let seeded = self
            .topology
            .slot(&m.match_id)
            .is_some_and(|slot| slot.source(side).is_some());
        if seeded {
            // Seeds are placed at assembly; an empty seeded side stays empty.
            return Ok(true);
        }
        let feeder = self
            .sources
            .get(&m.match_id)
            .and_then(|mapping| mapping.feeder(side))
            .map(str::to_string);
        match feeder {
            None => Ok(true),
            Some(feeder_id) => {
                let Some(feeder) = self.store.get_match(self.tournament_id, &feeder_id)? else {
                    return Ok(true);
                };
                Ok(feeder.status == MatchStatus::Pending
                    && feeder.is_vacuous()
                    && self.side_is_dead(&feeder, Side::Player1, depth + 1)?
                    && self.side_is_dead(&feeder, Side::Player2, depth + 1)?)
            }
        }
    }

    /// Complete `match_id` as a bye if it is one; returns the player who got the pass.
    fn complete_bye(&self, match_id: &str) -> Result<Option<PlayerRef>, TournamentError> {
        let mut m = self.load(match_id)?;
        if m.status != MatchStatus::Pending {
            return Ok(None);
        }
        let Some(side) = m.lone_player() else {
            return Ok(None);
        };
        if !self.side_is_dead(&m, side.other(), 0)? {
            return Ok(None);
        }
        let Some(player) = m.player(side).cloned() else {
            return Ok(None);
        };
        log::debug!("{} has a bye in {}", player.name, match_id);
        m.status = MatchStatus::Completed;
        m.winner = Some(player.name.clone());
        self.store.put_match(self.tournament_id, m)?;
        Ok(Some(player))
    }

    /// Move `winner` of `completed_match_id` onwards, following byes in live mode.
    fn advance(
        &self,
        completed_match_id: &str,
        winner: &PlayerRef,
        mode: ProgressMode,
    ) -> Result<Vec<ProgressEvent>, TournamentError> {
        let mut events = Vec::new();
        let mut work: VecDeque<(MatchId, PlayerRef, usize)> = VecDeque::new();
        work.push_back((completed_match_id.to_string(), winner.clone(), 0));

        while let Some((match_id, winner, hops)) = work.pop_front() {
            if hops > self.max_hops() {
                log::warn!("Bye cascade from {} did not terminate", completed_match_id);
                return Err(TournamentError::IntegrityViolation(format!(
                    "bye cascade from {} exceeded {} rounds",
                    completed_match_id,
                    self.max_hops()
                )));
            }

            let m = self.load(&match_id)?;
            if m.status != MatchStatus::Completed {
                return Err(TournamentError::IntegrityViolation(format!(
                    "match {} is not completed",
                    match_id
                )));
            }
            if m.winner.as_deref().is_some_and(|w| w != winner.name) {
                return Err(TournamentError::IntegrityViolation(format!(
                    "match {} was won by {}, not {}",
                    match_id,
                    m.winner.as_deref().unwrap_or_default(),
                    winner.name
                )));
            }

            let Some(next_id) = m.next_match_id.clone() else {
                let runner_up = m.opponent_of(&winner.name).map(|p| p.name.clone());
                self.store
                    .mark_tournament_finished(self.tournament_id, &winner.name, runner_up.as_deref())?;
                log::info!(
                    "Tournament {} finished: champion {}, runner-up {}",
                    self.tournament_id,
                    winner.name,
                    runner_up.as_deref().unwrap_or("-")
                );
                events.push(ProgressEvent::Finished {
                    champion: winner.name.clone(),
                    runner_up,
                });
                continue;
            };

            let mapping = self
                .sources
                .get(&next_id)
                .ok_or_else(|| TournamentError::NotFound(format!("feeders of {}", next_id)))?;
            let side = mapping.side_for(&match_id).ok_or_else(|| {
                TournamentError::IntegrityViolation(format!("{} does not feed {}", match_id, next_id))
            })?;

            let write = self
                .store
                .assign_player(self.tournament_id, &next_id, side, winner.advanced_from(&match_id))
                .inspect_err(|e| log::warn!("Advancing {} out of {}: {}", winner.name, match_id, e))?;
            if write == SlotWrite::Written {
                log::debug!("{} advances from {} to {} as {:?}", winner.name, match_id, next_id, side);
            }
            events.push(ProgressEvent::Advanced {
                from: match_id.clone(),
                to: next_id.clone(),
                side,
                player: winner.name.clone(),
            });

            if mode == ProgressMode::Live {
                if let Some(bye_winner) = self.complete_bye(&next_id)? {
                    events.push(ProgressEvent::Bye {
                        match_id: next_id.clone(),
                        player: bye_winner.name.clone(),
                    });
                    work.push_back((next_id, bye_winner, hops + 1));
                }
            }
        }
        Ok(events)
    }

    fn resolve_bye(&self, match_id: &str, mode: ProgressMode) -> Result<Vec<ProgressEvent>, TournamentError> {
        let Some(player) = self.complete_bye(match_id)? else {
            return Ok(Vec::new());
        };
        let mut events = vec![ProgressEvent::Bye {
            match_id: match_id.to_string(),
            player: player.name.clone(),
        }];
        events.extend(self.advance(match_id, &player, mode)?);
        Ok(events)
    }
}

/// Advance the winner of a completed match.
///
/// Knockout: writes the winner into its side of the next match (a guarded
/// write: an empty side is filled, the same player already there is a no-op,
/// anyone else is an `IntegrityViolation`), then in live mode completes any
/// byes this creates further up. With no next match the tournament is
/// finished with `winner` as champion; repeating that is harmless.
///
/// KOTH: rotates the challenger queue instead.
pub fn advance_winner<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    completed_match_id: &str,
    winner: &PlayerRef,
    topology: &BracketTopology,
    mode: ProgressMode,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    if topology.is_koth() {
        let rotation = koth::record_result(store, tournament_id, completed_match_id, winner)?;
        return Ok(vec![ProgressEvent::Rotated {
            incumbent: rotation.incumbent,
            challenger: rotation.challenger,
        }]);
    }
    Progression::new(store, tournament_id, topology).advance(completed_match_id, winner, mode)
}

/// Complete `match_id` without play when it is a bye, and advance its
/// player. Anything that is not a pending bye is left alone, so calling
/// this again is a no-op.
pub fn resolve_bye_if_needed<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    match_id: &str,
    topology: &BracketTopology,
    mode: ProgressMode,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    Progression::new(store, tournament_id, topology).resolve_bye(match_id, mode)
}

/// Resolve every bye in a freshly assembled bracket, stage by stage, so that
/// free passes are flattened before any score is entered.
pub fn initialize_bracket<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    topology: &BracketTopology,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    let progression = Progression::new(store, tournament_id, topology);
    let mut events = Vec::new();
    for stage in &topology.stages {
        for slot in &stage.slots {
            events.extend(progression.resolve_bye(&slot.id, ProgressMode::Initialization)?);
        }
    }
    let byes = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Bye { .. }))
        .count();
    log::info!("Bracket for {} initialized with {} bye(s)", tournament_id, byes);
    Ok(events)
}

/// After a played match completes: once every slot of its stage is completed
/// or empty, give the next stage's pending slots a chance to resolve as byes.
pub fn check_round_completion<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    completed_match: &Match,
    topology: &BracketTopology,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    let stage_idx = topology
        .stage_index_of(&completed_match.match_id)
        .ok_or_else(|| TournamentError::NotFound(format!("slot {}", completed_match.match_id)))?;
    let stage = &topology.stages[stage_idx];

    for slot in &stage.slots {
        let Some(m) = store.get_match(tournament_id, &slot.id)? else {
            continue;
        };
        if !(m.is_completed() || m.is_vacuous()) {
            log::debug!("{} still has matches to play", stage.name);
            return Ok(Vec::new());
        }
    }

    let Some(next_stage) = topology.stages.get(stage_idx + 1) else {
        return Ok(Vec::new());
    };
    log::debug!("{} complete, checking {} for byes", stage.name, next_stage.name);
    let progression = Progression::new(store, tournament_id, topology);
    let mut events = Vec::new();
    for slot in &next_stage.slots {
        events.extend(progression.resolve_bye(&slot.id, ProgressMode::Live)?);
    }
    Ok(events)
}
