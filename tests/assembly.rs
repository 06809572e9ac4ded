//! Integration tests for bracket assembly and the bracket view.

use court_bracket::{
    assemble, bracket_view, can_match_start, BracketTopology, MatchStatus, MatchView, Player,
    PlayerSource, Side,
};

fn players(n: usize) -> Vec<Player> {
    (0..n).map(|i| Player::new(format!("P{i}"), i)).collect()
}

#[test]
fn one_pending_match_per_slot() {
    let topo = BracketTopology::knockout(16).unwrap();
    let matches = assemble("t1", &topo, &players(16));
    assert_eq!(matches.len(), 15);
    for m in matches.values() {
        assert_eq!(m.status, MatchStatus::Pending);
        assert!(m.sets.is_empty());
        assert_eq!(m.tournament_id, "t1");
        assert_eq!(m.next_match_id, topo.slot(&m.match_id).unwrap().next);
    }
}

#[test]
fn seeds_past_the_roster_stay_empty() {
    let topo = BracketTopology::knockout(8).unwrap();
    let matches = assemble("t1", &topo, &players(5));

    let r1m1 = &matches["r1m1"];
    assert_eq!(r1m1.player1.as_ref().unwrap().name, "P0");
    assert_eq!(r1m1.player2.as_ref().unwrap().name, "P1");
    assert_eq!(
        r1m1.player2.as_ref().unwrap().source,
        Some(PlayerSource::Registrant(1))
    );

    let r1m3 = &matches["r1m3"];
    assert_eq!(r1m3.player1.as_ref().unwrap().name, "P4");
    assert!(r1m3.player2.is_none());
    assert!(matches["r1m4"].is_vacuous());
    assert!(matches["r2m1"].is_vacuous());
    assert!(matches["r3m1"].is_vacuous());
}

#[test]
fn can_start_only_with_both_players() {
    let topo = BracketTopology::knockout(4).unwrap();
    let matches = assemble("t1", &topo, &players(3));
    assert!(can_match_start(&matches["r1m1"]));
    assert!(!can_match_start(&matches["r1m2"]));
    assert!(!can_match_start(&matches["r2m1"]));
}

#[test]
fn bracket_view_shows_each_slot_state() {
    let topo = BracketTopology::knockout(8).unwrap();
    let matches = assemble("t1", &topo, &players(5));
    let view = bracket_view(&topo, &matches);
    assert_eq!(view.len(), 3);
    assert_eq!(view[0].name, "Quarterfinals");

    let first = &view[0].matches;
    assert!(matches!(first[0], MatchView::Scheduled(_)));
    assert!(matches!(
        &first[2],
        MatchView::AwaitingPlayers { side: Side::Player1, player, .. } if player.name == "P4"
    ));
    assert!(matches!(&first[3], MatchView::Unscheduled { match_id } if match_id == "r1m4"));
    assert!(matches!(view[2].matches[0], MatchView::Unscheduled { .. }));
}

#[test]
fn bracket_view_serializes_with_kind_tag() {
    let topo = BracketTopology::knockout(2).unwrap();
    let matches = assemble("t1", &topo, &players(1));
    let json = serde_json::to_value(bracket_view(&topo, &matches)).unwrap();
    let slot = &json[0]["matches"][0];
    assert_eq!(slot["kind"], "awaiting_players");
    assert_eq!(slot["match_id"], "r1m1");
    assert_eq!(slot["side"], "player1");
}
