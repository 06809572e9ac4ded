//! Sports tournament organizer: library with models, bracket progression, and scoring logic.

pub mod logic;
pub mod models;
pub mod store;

pub use logic::{
    adjust_score, advance_winner, assemble, bracket_view, can_match_start, check_round_completion,
    confirm_match, decided_winner, end_current_set, end_set, initialize_bracket, koth,
    resolve_bye_if_needed, score_point, scoring, start_tournament, KothRotation, MatchOutcome,
    ProgressEvent, ProgressMode, SetEnd, StageView, Tally, MAX_SET_SCORE,
};
pub use models::{
    BracketTopology, FormatType, KothStats, Match, MatchId, MatchSlot, MatchStatus, MatchView,
    Player, PlayerRef, PlayerSource, RuleConfig, ScoringMode, SetScore, Side, SourceMap,
    SourceMapping, Stage, Tiebreaker, Tournament, TournamentConfig, TournamentError, TournamentId,
    TournamentStatus, KOTH_MATCH_ID,
};
pub use store::{MemoryStore, SlotWrite, TournamentStore};
