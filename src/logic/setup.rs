//! Setup phase: start the tournament (Draft/Locked -> Live) and lay out the bracket.

use crate::logic::bracket::assemble;
use crate::logic::koth::seat_players;
use crate::logic::progression::{initialize_bracket, ProgressEvent};
use crate::models::{TournamentError, TournamentId, TournamentStatus};
use crate::store::TournamentStore;

/// Start the tournament: validate rules and format, create every match
/// record, and flatten the byes so play can begin. KOTH formats seat the
/// first two registrants and queue the rest instead.
///
/// A knockout field of one is decided on the spot: the lone player byes
/// through to the title.
pub fn start_tournament<S: TournamentStore + ?Sized>(
    store: &S,
    tournament_id: TournamentId,
) -> Result<Vec<ProgressEvent>, TournamentError> {
    let mut t = store.get_tournament(tournament_id)?;
    if !matches!(t.status, TournamentStatus::Draft | TournamentStatus::Locked) {
        return Err(TournamentError::InvalidState);
    }
    if t.players.is_empty() {
        return Err(TournamentError::PreconditionFailed("no players registered".into()));
    }
    t.config.rules.validate()?;
    let topology = store.get_topology(&t.config.format_id)?;
    topology.validate()?;

    if topology.is_koth() {
        let court = seat_players(&mut t);
        t.status = TournamentStatus::Live;
        t.touch();
        log::info!(
            "KOTH {} started with {} players, {} waiting",
            t.id,
            t.players.len(),
            t.koth_queue.len()
        );
        store.put_tournament(t)?;
        store.put_match(tournament_id, court)?;
        return Ok(Vec::new());
    }

    if topology.total_slots > 0 && t.players.len() > topology.total_slots {
        return Err(TournamentError::TournamentFull {
            capacity: topology.total_slots,
        });
    }
    let matches = assemble(&tournament_id.to_string(), &topology, &t.players);
    t.status = TournamentStatus::Live;
    t.touch();
    log::info!(
        "Tournament {} started: {} players on {} ({} matches)",
        t.id,
        t.players.len(),
        topology.id,
        matches.len()
    );
    store.put_tournament(t)?;
    for m in matches.into_values() {
        store.put_match(tournament_id, m)?;
    }
    initialize_bracket(store, tournament_id, &topology)
}
