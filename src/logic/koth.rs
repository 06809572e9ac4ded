//! King of the hill: one court, winner stays on, loser joins the back of the queue.

use crate::models::{
    Match, MatchStatus, Player, PlayerRef, Tournament, TournamentError, TournamentId,
    KOTH_MATCH_ID,
};
use crate::store::TournamentStore;

/// State of the court after a rotation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KothRotation {
    pub incumbent: String,
    pub challenger: Option<String>,
    /// Queue after the challenger was called up, head first.
    pub queue: Vec<String>,
}

/// Record the result of the court match and call up the next challenger.
///
/// The winner's tally goes up by one, the loser (if there was one) joins the
/// back of the queue, and the queue head takes them on. The court match is
/// reset for the new pairing; with nobody waiting the incumbent stays `live`
/// on their own.
pub fn record_result<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    completed_match_id: &str,
    winner: &PlayerRef,
) -> Result<KothRotation, TournamentError> {
    let m = store
        .get_match(tournament_id, completed_match_id)?
        .ok_or_else(|| TournamentError::NotFound(format!("match {}", completed_match_id)))?;
    if m.status != MatchStatus::Completed {
        return Err(TournamentError::IntegrityViolation(format!(
            "match {} is not completed",
            completed_match_id
        )));
    }
    if m.side_of(&winner.name).is_none() {
        return Err(TournamentError::IntegrityViolation(format!(
            "{} did not play in {}",
            winner.name, completed_match_id
        )));
    }
    let loser = m.opponent_of(&winner.name).map(|p| p.name.clone());

    let mut challenger = None;
    let updated = store.update_tournament(tournament_id, &mut |t: &mut Tournament| {
        t.koth_stats.entry(winner.name.clone()).or_default().wins += 1;
        if let Some(loser) = &loser {
            t.koth_queue.push(loser.clone());
        }
        t.koth_queue.retain(|name| name != &winner.name);
        challenger = (!t.koth_queue.is_empty()).then(|| t.koth_queue.remove(0));
        t.touch();
        Ok(())
    })?;

    let mut court = Match::new(m.match_id.clone(), m.tournament_id.clone(), None);
    court.player1 = Some(PlayerRef::named(winner.name.clone()));
    court.player2 = challenger.clone().map(PlayerRef::named);
    court.status = if court.player2.is_some() {
        MatchStatus::Pending
    } else {
        MatchStatus::Live
    };
    store.put_match(tournament_id, court)?;

    log::info!(
        "KOTH: {} stays on, {} to the back, next up {}",
        winner.name,
        loser.as_deref().unwrap_or("nobody"),
        challenger.as_deref().unwrap_or("nobody")
    );
    Ok(KothRotation {
        incumbent: winner.name.clone(),
        challenger,
        queue: updated.koth_queue,
    })
}

/// Seat the first two registrants on court and queue the rest in
/// registration order. Returns the court match.
pub fn seat_players(tournament: &mut Tournament) -> Match {
    let mut names = tournament.players.iter().map(|p| p.name.clone());
    let mut court = Match::new(KOTH_MATCH_ID, tournament.id.to_string(), None);
    court.player1 = names.next().map(PlayerRef::named);
    court.player2 = names.next().map(PlayerRef::named);
    tournament.koth_queue = names.collect();
    if court.player1.is_some() && court.player2.is_none() {
        court.status = MatchStatus::Live;
    }
    court
}

/// Register a player while a KOTH tournament is live. The newcomer goes to
/// the back of the queue; an idle court then calls up whoever is at the head.
pub fn join<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
    name: &str,
    user_id: Option<String>,
) -> Result<Player, TournamentError> {
    let mut joined = None;
    store.update_tournament(tournament_id, &mut |t: &mut Tournament| {
        joined = Some(t.join_queue(name, user_id.clone())?.clone());
        Ok(())
    })?;
    call_up_challengers(store, tournament_id)?;
    joined.ok_or(TournamentError::InvalidState)
}

/// Fill empty sides of an idle court from the queue head.
fn call_up_challengers<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
) -> Result<(), TournamentError> {
    let Some(mut court) = store.get_match(tournament_id, KOTH_MATCH_ID)? else {
        return Err(TournamentError::NotFound(format!("match {}", KOTH_MATCH_ID)));
    };
    if court.status == MatchStatus::Completed || court.has_both_players() {
        return Ok(());
    }
    let open = [court.player1.is_none(), court.player2.is_none()]
        .iter()
        .filter(|&&empty| empty)
        .count();
    let mut called = Vec::new();
    store.update_tournament(tournament_id, &mut |t: &mut Tournament| {
        let take = open.min(t.koth_queue.len());
        called = t.koth_queue.drain(..take).collect();
        Ok(())
    })?;
    if called.is_empty() {
        return Ok(());
    }
    for name in called {
        let side = if court.player1.is_none() {
            &mut court.player1
        } else {
            &mut court.player2
        };
        *side = Some(PlayerRef::named(name));
    }
    court.status = if court.has_both_players() {
        MatchStatus::Pending
    } else {
        MatchStatus::Live
    };
    log::debug!(
        "KOTH court now {} vs {}",
        court.player1.as_ref().map_or("-", |p| p.name.as_str()),
        court.player2.as_ref().map_or("-", |p| p.name.as_str())
    );
    store.put_match(tournament_id, court)
}

/// Players by KOTH wins, most first; ties keep name order.
pub fn standings(tournament: &Tournament) -> Vec<(String, u32)> {
    let mut table: Vec<(String, u32)> = tournament
        .koth_stats
        .iter()
        .map(|(name, stats)| (name.clone(), stats.wins))
        .collect();
    table.sort_by(|a, b| b.1.cmp(&a.1));
    table
}
