//! Data structures for the bracket engine: players, matches, rules, topology, tournament.

mod game;
mod player;
mod rules;
mod topology;
mod tournament;

pub use game::{Match, MatchId, MatchStatus, MatchView, SetScore, Side};
pub use player::{Player, PlayerRef, PlayerSource};
pub use rules::{RuleConfig, ScoringMode, Tiebreaker};
pub use topology::{
    BracketTopology, FormatType, MatchSlot, SourceMap, SourceMapping, Stage, KOTH_MATCH_ID,
};
pub use tournament::{
    KothStats, Tournament, TournamentConfig, TournamentError, TournamentId, TournamentStatus,
};
