//! Integration tests for king of the hill: rotation, joining, standings.

use court_bracket::{
    confirm_match, koth, start_tournament, Match, MatchStatus, MemoryStore, PlayerRef,
    ProgressEvent, RuleConfig, SetScore, Side, Tournament, TournamentError, TournamentId,
    TournamentStore, KOTH_MATCH_ID,
};

fn started(names: &[&str]) -> (MemoryStore, TournamentId) {
    let store = MemoryStore::new();
    let t = Tournament::with_players("koth", RuleConfig::best_of(1, 11), names.iter().copied());
    let id = t.id;
    store.insert_tournament(t).unwrap();
    start_tournament(&store, id).unwrap();
    (store, id)
}

fn court(store: &MemoryStore, id: TournamentId) -> Match {
    store.get_match(id, KOTH_MATCH_ID).unwrap().unwrap()
}

fn on_court(m: &Match) -> (Option<&str>, Option<&str>) {
    (
        m.player1.as_ref().map(|p| p.name.as_str()),
        m.player2.as_ref().map(|p| p.name.as_str()),
    )
}

/// Play one single-set game on court, won by `side`.
fn play(store: &MemoryStore, id: TournamentId, side: Side) -> Vec<ProgressEvent> {
    let mut m = court(store, id);
    m.sets = vec![match side {
        Side::Player1 => SetScore::new(11, 4),
        Side::Player2 => SetScore::new(4, 11),
    }];
    m.current_set = 1;
    m.status = MatchStatus::Live;
    store.put_match(id, m).unwrap();
    confirm_match(store, id, KOTH_MATCH_ID).unwrap()
}

#[test]
fn start_seats_two_and_queues_the_rest() {
    let (store, id) = started(&["A", "B", "C", "D"]);
    let m = court(&store, id);
    assert_eq!(on_court(&m), (Some("A"), Some("B")));
    assert_eq!(m.status, MatchStatus::Pending);
    assert_eq!(store.get_tournament(id).unwrap().koth_queue, ["C", "D"]);
}

#[test]
fn winner_stays_loser_to_the_back() {
    let (store, id) = started(&["A", "B", "C"]);
    let events = play(&store, id, Side::Player1);
    assert_eq!(
        events,
        vec![ProgressEvent::Rotated {
            incumbent: "A".into(),
            challenger: Some("C".into()),
        }]
    );

    let m = court(&store, id);
    assert_eq!(on_court(&m), (Some("A"), Some("C")));
    assert_eq!(m.status, MatchStatus::Pending);
    assert!(m.sets.is_empty());
    let t = store.get_tournament(id).unwrap();
    assert_eq!(t.koth_queue, ["B"]);
    assert_eq!(t.koth_stats["A"].wins, 1);
}

#[test]
fn challenger_who_wins_takes_the_court() {
    let (store, id) = started(&["A", "B", "C"]);
    play(&store, id, Side::Player2);
    assert_eq!(on_court(&court(&store, id)), (Some("B"), Some("C")));
    let t = store.get_tournament(id).unwrap();
    assert_eq!(t.koth_queue, ["A"]);
    assert!(!t.koth_queue.contains(&"B".to_string()));
}

#[test]
fn two_players_keep_playing_each_other() {
    let (store, id) = started(&["A", "B"]);
    play(&store, id, Side::Player2);
    assert_eq!(on_court(&court(&store, id)), (Some("B"), Some("A")));
    assert!(store.get_tournament(id).unwrap().koth_queue.is_empty());
}

#[test]
fn lone_incumbent_waits_live_until_someone_joins() {
    let (store, id) = started(&["A"]);
    let m = court(&store, id);
    assert_eq!(on_court(&m), (Some("A"), None));
    assert_eq!(m.status, MatchStatus::Live);

    koth::join(&store, id, "B", None).unwrap();
    let m = court(&store, id);
    assert_eq!(on_court(&m), (Some("A"), Some("B")));
    assert_eq!(m.status, MatchStatus::Pending);
    assert!(store.get_tournament(id).unwrap().koth_queue.is_empty());
}

#[test]
fn join_goes_to_the_back_of_the_queue() {
    let (store, id) = started(&["A", "B", "C"]);
    let player = koth::join(&store, id, "  D ", Some("user-4".into())).unwrap();
    assert_eq!(player.name, "D");
    assert_eq!(player.index, 3);
    assert_eq!(player.user_id.as_deref(), Some("user-4"));
    assert_eq!(store.get_tournament(id).unwrap().koth_queue, ["C", "D"]);
    assert_eq!(on_court(&court(&store, id)), (Some("A"), Some("B")));

    assert!(matches!(
        koth::join(&store, id, "d", None),
        Err(TournamentError::DuplicatePlayerName)
    ));
}

#[test]
fn join_requires_a_live_koth() {
    let store = MemoryStore::new();
    let t = Tournament::with_players("ko_4", RuleConfig::default(), ["A", "B"]);
    let id = t.id;
    store.insert_tournament(t).unwrap();
    start_tournament(&store, id).unwrap();
    assert!(matches!(
        koth::join(&store, id, "C", None),
        Err(TournamentError::InvalidState)
    ));
}

#[test]
fn result_needs_a_completed_match_with_that_winner() {
    let (store, id) = started(&["A", "B", "C"]);
    let result = koth::record_result(&store, id, KOTH_MATCH_ID, &PlayerRef::named("A"));
    assert!(matches!(result, Err(TournamentError::IntegrityViolation(_))));

    let mut m = court(&store, id);
    m.status = MatchStatus::Completed;
    m.winner = Some("A".into());
    store.put_match(id, m).unwrap();
    let result = koth::record_result(&store, id, KOTH_MATCH_ID, &PlayerRef::named("C"));
    assert!(matches!(result, Err(TournamentError::IntegrityViolation(_))));
    assert!(store.get_tournament(id).unwrap().koth_stats.is_empty());
}

#[test]
fn standings_rank_by_wins() {
    let (store, id) = started(&["A", "B", "C"]);
    play(&store, id, Side::Player1); // A beats B; A vs C
    play(&store, id, Side::Player2); // C beats A; C vs B
    play(&store, id, Side::Player1); // C beats B
    let t = store.get_tournament(id).unwrap();
    assert_eq!(
        koth::standings(&t),
        vec![("C".to_string(), 2), ("A".to_string(), 1)]
    );
}

#[test]
fn live_koth_registration_goes_through_the_queue() {
    let (store, id) = started(&["A", "B", "C"]);
    let imported = store.update_tournament(id, &mut |t: &mut Tournament| {
        t.import_roster("Zed\n".as_bytes()).map(|_| ())
    });
    assert!(matches!(imported, Err(TournamentError::InvalidState)));

    let mut t = store.get_tournament(id).unwrap();
    assert_eq!(t.players.len(), 3);
    assert!(matches!(t.add_player("Zed", None), Err(TournamentError::InvalidState)));

    koth::join(&store, id, "Zed", None).unwrap();
    let t = store.get_tournament(id).unwrap();
    assert_eq!(t.players.len(), 4);
    assert_eq!(t.koth_queue, ["C", "Zed"]);
}

#[test]
fn racing_confirms_record_one_win() {
    let (store, id) = started(&["A", "B", "C"]);
    let mut live = court(&store, id);
    live.sets = vec![SetScore::new(11, 4)];
    live.current_set = 1;
    live.status = MatchStatus::Live;
    store.put_match(id, live.clone()).unwrap();

    // Both scorers read the same live game and try to close it.
    let mut done = live.clone();
    done.status = MatchStatus::Completed;
    done.winner = Some("A".into());
    store.put_match_if_unchanged(id, &live.sets, done.clone()).unwrap();
    assert!(matches!(
        store.put_match_if_unchanged(id, &live.sets, done),
        Err(TournamentError::Conflict)
    ));

    koth::record_result(&store, id, KOTH_MATCH_ID, &PlayerRef::named("A")).unwrap();
    let t = store.get_tournament(id).unwrap();
    assert_eq!(t.koth_stats["A"].wins, 1);
    assert_eq!(on_court(&court(&store, id)), (Some("A"), Some("C")));
}
