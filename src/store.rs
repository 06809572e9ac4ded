//! Storage seam: the narrow read/write interface the engine runs against,
//! plus an in-memory implementation used by the web server and tests.
//!
//! Writes that can race are expressed as guarded operations so the store can
//! apply them atomically: `assign_player` only fills an empty side, and
//! `put_match_if_unchanged` is a compare-and-set on the set array that
//! never overwrites a completed match.

use crate::models::{
    BracketTopology, Match, MatchId, Player, PlayerRef, RuleConfig, SetScore, Side, Tournament,
    TournamentError, TournamentId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Result of a guarded slot write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotWrite {
    /// The side was empty and now holds the player.
    Written,
    /// The side already held this player; nothing changed.
    AlreadyPresent,
}

/// Read/write interface to persisted tournaments and matches.
pub trait TournamentStore: Send + Sync {
    fn get_tournament(&self, tournament_id: TournamentId) -> Result<Tournament, TournamentError>;

    fn put_tournament(&self, tournament: Tournament) -> Result<(), TournamentError>;

    /// Apply `f` to the stored tournament as one read-modify-write.
    fn update_tournament(
        &self,
        tournament_id: TournamentId,
        f: &mut dyn FnMut(&mut Tournament) -> Result<(), TournamentError>,
    ) -> Result<Tournament, TournamentError>;

    fn get_match(&self, tournament_id: TournamentId, match_id: &str) -> Result<Option<Match>, TournamentError>;

    /// All matches of a tournament, ordered by id.
    fn list_matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>, TournamentError>;

    fn put_match(&self, tournament_id: TournamentId, m: Match) -> Result<(), TournamentError>;

    /// Store `m` only if the stored match still has `expected_sets` and is
    /// not completed; otherwise fail with `Conflict`.
    fn put_match_if_unchanged(
        &self,
        tournament_id: TournamentId,
        expected_sets: &[SetScore],
        m: Match,
    ) -> Result<(), TournamentError>;

    /// Fill `side` of a match with `player` if that side is empty.
    /// The same name already there is a no-op; a different name is an
    /// `IntegrityViolation`.
    fn assign_player(
        &self,
        tournament_id: TournamentId,
        match_id: &str,
        side: Side,
        player: PlayerRef,
    ) -> Result<SlotWrite, TournamentError>;

    fn mark_tournament_finished(
        &self,
        tournament_id: TournamentId,
        champion: &str,
        runner_up: Option<&str>,
    ) -> Result<(), TournamentError> {
        self.update_tournament(tournament_id, &mut |t: &mut Tournament| {
            t.finish(champion, runner_up)
        })
        .map(|_| ())
    }

    fn list_players(&self, tournament_id: TournamentId) -> Result<Vec<Player>, TournamentError> {
        Ok(self.get_tournament(tournament_id)?.players)
    }

    fn get_rule_config(&self, tournament_id: TournamentId) -> Result<RuleConfig, TournamentError> {
        Ok(self.get_tournament(tournament_id)?.config.rules)
    }

    fn get_topology(&self, format_id: &str) -> Result<BracketTopology, TournamentError> {
        BracketTopology::builtin(format_id)
    }
}

/// Per-tournament entry: tournament data, its matches, and last activity time (for auto-cleanup).
struct TournamentEntry {
    tournament: Tournament,
    matches: BTreeMap<MatchId, Match>,
    last_activity: Instant,
}

/// In-memory store: many tournaments by id behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<TournamentId, TournamentEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a tournament, dropping any matches it had.
    pub fn insert_tournament(&self, tournament: Tournament) -> Result<(), TournamentError> {
        let mut g = self.write()?;
        g.insert(
            tournament.id,
            TournamentEntry {
                tournament,
                matches: BTreeMap::new(),
                last_activity: Instant::now(),
            },
        );
        Ok(())
    }

    /// Remove tournaments with no writes for `timeout`; returns how many went.
    pub fn remove_inactive(&self, timeout: Duration) -> Result<usize, TournamentError> {
        let mut g = self.write()?;
        let before = g.len();
        g.retain(|_, entry| entry.last_activity.elapsed() < timeout);
        Ok(before - g.len())
    }

    pub fn len(&self) -> usize {
        self.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<TournamentId, TournamentEntry>>, TournamentError> {
        self.inner
            .read()
            .map_err(|_| TournamentError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<TournamentId, TournamentEntry>>, TournamentError> {
        self.inner
            .write()
            .map_err(|_| TournamentError::Storage("lock poisoned".into()))
    }
}

fn entry_mut(
    g: &mut HashMap<TournamentId, TournamentEntry>,
    tournament_id: TournamentId,
) -> Result<&mut TournamentEntry, TournamentError> {
    let entry = g
        .get_mut(&tournament_id)
        .ok_or_else(|| TournamentError::NotFound(format!("tournament {}", tournament_id)))?;
    entry.last_activity = Instant::now();
    Ok(entry)
}

impl TournamentStore for MemoryStore {
    fn get_tournament(&self, tournament_id: TournamentId) -> Result<Tournament, TournamentError> {
        self.read()?
            .get(&tournament_id)
            .map(|e| e.tournament.clone())
            .ok_or_else(|| TournamentError::NotFound(format!("tournament {}", tournament_id)))
    }

    fn put_tournament(&self, tournament: Tournament) -> Result<(), TournamentError> {
        let mut g = self.write()?;
        match g.get_mut(&tournament.id) {
            Some(entry) => {
                entry.tournament = tournament;
                entry.last_activity = Instant::now();
            }
            None => {
                g.insert(
                    tournament.id,
                    TournamentEntry {
                        tournament,
                        matches: BTreeMap::new(),
                        last_activity: Instant::now(),
                    },
                );
            }
        }
        Ok(())
    }

    fn update_tournament(
        &self,
        tournament_id: TournamentId,
        f: &mut dyn FnMut(&mut Tournament) -> Result<(), TournamentError>,
    ) -> Result<Tournament, TournamentError> {
        let mut g = self.write()?;
        let entry = entry_mut(&mut g, tournament_id)?;
        // Work on a copy so a failed update leaves the stored document untouched.
        let mut updated = entry.tournament.clone();
        f(&mut updated)?;
        entry.tournament = updated.clone();
        Ok(updated)
    }

    fn get_match(&self, tournament_id: TournamentId, match_id: &str) -> Result<Option<Match>, TournamentError> {
        let g = self.read()?;
        let entry = g
            .get(&tournament_id)
            .ok_or_else(|| TournamentError::NotFound(format!("tournament {}", tournament_id)))?;
        Ok(entry.matches.get(match_id).cloned())
    }

    fn list_matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>, TournamentError> {
        let g = self.read()?;
        let entry = g
            .get(&tournament_id)
            .ok_or_else(|| TournamentError::NotFound(format!("tournament {}", tournament_id)))?;
        Ok(entry.matches.values().cloned().collect())
    }

    fn put_match(&self, tournament_id: TournamentId, m: Match) -> Result<(), TournamentError> {
        let mut g = self.write()?;
        let entry = entry_mut(&mut g, tournament_id)?;
        entry.matches.insert(m.match_id.clone(), m);
        Ok(())
    }

    fn put_match_if_unchanged(
        &self,
        tournament_id: TournamentId,
        expected_sets: &[SetScore],
        m: Match,
    ) -> Result<(), TournamentError> {
        let mut g = self.write()?;
        let entry = entry_mut(&mut g, tournament_id)?;
        let current = entry
            .matches
            .get(&m.match_id)
            .ok_or_else(|| TournamentError::NotFound(format!("match {}", m.match_id)))?;
        if current.sets != expected_sets {
            log::warn!("Stale score write on match {} rejected", m.match_id);
            return Err(TournamentError::Conflict);
        }
        if current.is_completed() {
            log::warn!("Write to completed match {} rejected", m.match_id);
            return Err(TournamentError::Conflict);
        }
        entry.matches.insert(m.match_id.clone(), m);
        Ok(())
    }

    fn assign_player(
        &self,
        tournament_id: TournamentId,
        match_id: &str,
        side: Side,
        player: PlayerRef,
    ) -> Result<SlotWrite, TournamentError> {
        let mut g = self.write()?;
        let entry = entry_mut(&mut g, tournament_id)?;
        let m = entry
            .matches
            .get_mut(match_id)
            .ok_or_else(|| TournamentError::NotFound(format!("match {}", match_id)))?;
        let slot = m.player_mut(side);
        if let Some(existing) = slot.as_ref() {
            if existing.name == player.name {
                return Ok(SlotWrite::AlreadyPresent);
            }
            return Err(TournamentError::IntegrityViolation(format!(
                "{:?} of {} already holds {}, refusing to write {}",
                side, match_id, existing.name, player.name
            )));
        }
        *slot = Some(player);
        Ok(SlotWrite::Written)
    }
}
