//! Integration tests for score entry: points, closing sets, confirming matches.

use court_bracket::{
    adjust_score, confirm_match, end_current_set, end_set, score_point, start_tournament, Match,
    MatchStatus, MemoryStore, PlayerRef, RuleConfig, SetEnd, SetScore, Side, Tournament,
    TournamentError, TournamentId, TournamentStatus, TournamentStore, MAX_SET_SCORE,
};

fn ready_match() -> Match {
    let mut m = Match::new("r1m1", "t1", None);
    m.player1 = Some(PlayerRef::named("Ann"));
    m.player2 = Some(PlayerRef::named("Bob"));
    m
}

/// Score a whole set point by point.
fn set_to(m: &mut Match, p1: u32, p2: u32) {
    adjust_score(m, Side::Player1, p1 as i32).unwrap();
    adjust_score(m, Side::Player2, p2 as i32).unwrap();
}

fn started(rules: RuleConfig, names: &[&str]) -> (MemoryStore, TournamentId) {
    let store = MemoryStore::new();
    let t = Tournament::with_players("ko_4", rules, names.iter().copied());
    let id = t.id;
    store.insert_tournament(t).unwrap();
    start_tournament(&store, id).unwrap();
    (store, id)
}

#[test]
fn first_point_opens_the_match() {
    let mut m = ready_match();
    adjust_score(&mut m, Side::Player2, 1).unwrap();
    assert_eq!(m.status, MatchStatus::Live);
    assert_eq!(m.sets, vec![SetScore::new(0, 1)]);
    assert_eq!(m.current_set, 0);
}

#[test]
fn points_never_go_below_zero() {
    let mut m = ready_match();
    adjust_score(&mut m, Side::Player1, 2).unwrap();
    adjust_score(&mut m, Side::Player1, -5).unwrap();
    assert_eq!(m.sets[0].p1_score, 0);
}

#[test]
fn points_are_capped_per_set() {
    let mut m = ready_match();
    adjust_score(&mut m, Side::Player1, i32::MAX).unwrap();
    adjust_score(&mut m, Side::Player1, i32::MAX).unwrap();
    assert_eq!(m.sets[0].p1_score, MAX_SET_SCORE);
    adjust_score(&mut m, Side::Player1, -1).unwrap();
    assert_eq!(m.sets[0].p1_score, MAX_SET_SCORE - 1);
}

#[test]
fn scoring_needs_both_players_and_an_open_match() {
    let mut waiting = Match::new("r2m1", "t1", None);
    waiting.player1 = Some(PlayerRef::named("Ann"));
    assert!(matches!(
        adjust_score(&mut waiting, Side::Player1, 1),
        Err(TournamentError::PreconditionFailed(_))
    ));

    let mut done = ready_match();
    done.status = MatchStatus::Completed;
    assert!(matches!(
        adjust_score(&mut done, Side::Player1, 1),
        Err(TournamentError::InvalidState)
    ));
}

#[test]
fn set_closes_only_at_target_with_two_point_lead() {
    let rule = RuleConfig::best_of(3, 21);
    let mut m = ready_match();
    set_to(&mut m, 20, 18);
    assert!(matches!(
        end_current_set(&mut m, &rule),
        Err(TournamentError::PreconditionFailed(_))
    ));
    adjust_score(&mut m, Side::Player1, 1).unwrap();
    adjust_score(&mut m, Side::Player2, 2).unwrap();
    assert!(end_current_set(&mut m, &rule).is_err(), "21-20 is not over");
    adjust_score(&mut m, Side::Player1, 2).unwrap();
    assert_eq!(
        end_current_set(&mut m, &rule).unwrap(),
        SetEnd::NextSet { current_set: 1 }
    );
    assert_eq!(m.sets.len(), 2);
}

#[test]
fn blank_set_cannot_be_closed() {
    let mut m = ready_match();
    m.sets.push(SetScore::default());
    assert!(matches!(
        end_current_set(&mut m, &RuleConfig::default()),
        Err(TournamentError::PreconditionFailed(_))
    ));
}

#[test]
fn straight_sets_decide_the_match() {
    let rule = RuleConfig::best_of(3, 21);
    let mut m = ready_match();
    set_to(&mut m, 21, 15);
    end_current_set(&mut m, &rule).unwrap();
    set_to(&mut m, 21, 17);
    assert_eq!(
        end_current_set(&mut m, &rule).unwrap(),
        SetEnd::MatchDecided { winner: Side::Player1 }
    );
    assert_eq!(m.current_set, 2);
}

#[test]
fn deciding_set_plays_to_the_tiebreaker_target() {
    let rule = RuleConfig::for_sport("volleyball").unwrap();
    let mut m = ready_match();
    set_to(&mut m, 25, 20);
    end_current_set(&mut m, &rule).unwrap();
    set_to(&mut m, 20, 25);
    end_current_set(&mut m, &rule).unwrap();
    set_to(&mut m, 13, 15);
    assert_eq!(
        end_current_set(&mut m, &rule).unwrap(),
        SetEnd::MatchDecided { winner: Side::Player2 }
    );
}

#[test]
fn cumulative_tie_opens_overtime() {
    let rule = RuleConfig::cumulative(4, 25, true);
    let mut m = ready_match();
    for (p1, p2) in [(20, 18), (22, 20), (19, 25)] {
        set_to(&mut m, p1, p2);
        assert!(matches!(end_current_set(&mut m, &rule).unwrap(), SetEnd::NextSet { .. }));
    }
    set_to(&mut m, 21, 19);
    assert_eq!(
        end_current_set(&mut m, &rule).unwrap(),
        SetEnd::Overtime { current_set: 4, overtime: 1 }
    );
    set_to(&mut m, 5, 3);
    assert_eq!(
        end_current_set(&mut m, &rule).unwrap(),
        SetEnd::MatchDecided { winner: Side::Player1 }
    );
}

#[test]
fn cumulative_tie_without_overtime_needs_an_organizer() {
    let rule = RuleConfig::cumulative(2, 25, false);
    let mut m = ready_match();
    set_to(&mut m, 20, 18);
    end_current_set(&mut m, &rule).unwrap();
    set_to(&mut m, 18, 20);
    assert_eq!(end_current_set(&mut m, &rule).unwrap(), SetEnd::UndecidedTie);
    assert_eq!(m.current_set, 2);
}

#[test]
fn confirming_an_undecided_tie_fails() {
    let (store, id) = started(RuleConfig::cumulative(2, 25, false), &["A", "B", "C", "D"]);
    let mut m = store.get_match(id, "r1m1").unwrap().unwrap();
    m.sets = vec![SetScore::new(20, 18), SetScore::new(18, 20)];
    m.current_set = 2;
    m.status = MatchStatus::Live;
    store.put_match(id, m).unwrap();
    assert!(matches!(
        confirm_match(&store, id, "r1m1"),
        Err(TournamentError::UndecidedTie)
    ));
    let m = store.get_match(id, "r1m1").unwrap().unwrap();
    assert_eq!(m.status, MatchStatus::Live);
}

#[test]
fn confirming_an_unfinished_match_fails() {
    let (store, id) = started(RuleConfig::best_of(3, 11), &["A", "B", "C", "D"]);
    score_point(&store, id, "r1m1", Side::Player1, 5).unwrap();
    assert!(matches!(
        confirm_match(&store, id, "r1m1"),
        Err(TournamentError::PreconditionFailed(_))
    ));
}

#[test]
fn stale_score_write_is_a_conflict() {
    let (store, id) = started(RuleConfig::best_of(3, 11), &["A", "B", "C", "D"]);
    let stale = store.get_match(id, "r1m1").unwrap().unwrap();
    score_point(&store, id, "r1m1", Side::Player1, 1).unwrap();

    let mut overwrite = stale.clone();
    overwrite.sets = vec![SetScore::new(0, 1)];
    assert!(matches!(
        store.put_match_if_unchanged(id, &stale.sets, overwrite),
        Err(TournamentError::Conflict)
    ));
    let m = store.get_match(id, "r1m1").unwrap().unwrap();
    assert_eq!(m.sets, vec![SetScore::new(1, 0)]);
}

#[test]
fn scoring_waits_for_the_tournament_to_start() {
    let store = MemoryStore::new();
    let t = Tournament::with_players("ko_4", RuleConfig::default(), ["A", "B"]);
    let id = t.id;
    store.insert_tournament(t).unwrap();
    assert!(matches!(
        score_point(&store, id, "r1m1", Side::Player1, 1),
        Err(TournamentError::InvalidState)
    ));
}

#[test]
fn full_bracket_through_the_store() {
    let (store, id) = started(RuleConfig::best_of(1, 11), &["A", "B", "C", "D"]);
    for (match_id, side) in [("r1m1", Side::Player1), ("r1m2", Side::Player2), ("r2m1", Side::Player2)] {
        score_point(&store, id, match_id, side, 11).unwrap();
        let (end, _) = end_set(&store, id, match_id).unwrap();
        assert_eq!(end, SetEnd::MatchDecided { winner: side });
        confirm_match(&store, id, match_id).unwrap();
    }
    let t = store.get_tournament(id).unwrap();
    assert_eq!(t.status, TournamentStatus::Finished);
    assert_eq!(t.champion.as_deref(), Some("D"));
    assert_eq!(t.runner_up.as_deref(), Some("A"));
}
