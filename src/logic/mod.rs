//! Tournament business logic: scoring, bracket assembly, progression, king of the hill.

mod bracket;
pub mod koth;
mod match_play;
mod progression;
pub mod scoring;
mod setup;

pub use bracket::{assemble, bracket_view, can_match_start, StageView};
pub use koth::KothRotation;
pub use match_play::{
    adjust_score, confirm_match, decided_winner, end_current_set, end_set, score_point, SetEnd,
    MAX_SET_SCORE,
};
pub use progression::{
    advance_winner, check_round_completion, initialize_bracket, resolve_bye_if_needed,
    ProgressEvent, ProgressMode,
};
pub use scoring::{MatchOutcome, Tally};
pub use setup::start_tournament;
