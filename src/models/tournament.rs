//! Tournament document, lifecycle status, and the engine's error type.

use crate::models::player::Player;
use crate::models::rules::RuleConfig;
use crate::models::topology::BracketTopology;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Referenced tournament, match, or slot does not exist.
    NotFound(String),
    /// The requested transition is not allowed yet (set or match not finished).
    PreconditionFailed(String),
    /// A write would clobber existing data, or a match was used out of order.
    IntegrityViolation(String),
    /// Cumulative match tied after the fixed sets with overtime disabled.
    UndecidedTie,
    /// The stored match changed since it was read; re-read and retry.
    Conflict,
    /// Tournament is not in a state that allows this action.
    InvalidState,
    /// A player with this name already exists (names are unique, case-insensitive).
    DuplicatePlayerName,
    EmptyPlayerName,
    /// Registration is closed because every bracket slot is taken.
    TournamentFull { capacity: usize },
    UnknownFormat(String),
    InvalidTopology(String),
    InvalidRules(String),
    /// Roster file could not be read.
    Roster(String),
    /// Backing store failure (e.g. poisoned lock).
    Storage(String),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::NotFound(what) => write!(f, "Not found: {}", what),
            TournamentError::PreconditionFailed(why) => write!(f, "Not yet complete: {}", why),
            TournamentError::IntegrityViolation(why) => write!(f, "Integrity violation: {}", why),
            TournamentError::UndecidedTie => {
                write!(f, "Total score is tied and overtime is not allowed; organizer decision required")
            }
            TournamentError::Conflict => write!(f, "Match was updated concurrently; reload and retry"),
            TournamentError::InvalidState => write!(f, "Invalid state for this action"),
            TournamentError::DuplicatePlayerName => write!(f, "A player with this name already exists"),
            TournamentError::EmptyPlayerName => write!(f, "Player name must not be empty"),
            TournamentError::TournamentFull { capacity } => {
                write!(f, "Tournament is full ({} players)", capacity)
            }
            TournamentError::UnknownFormat(id) => write!(f, "Unknown format {}", id),
            TournamentError::InvalidTopology(why) => write!(f, "Invalid bracket: {}", why),
            TournamentError::InvalidRules(why) => write!(f, "Invalid rules: {}", why),
            TournamentError::Roster(why) => write!(f, "Could not read roster: {}", why),
            TournamentError::Storage(why) => write!(f, "Storage error: {}", why),
        }
    }
}

impl std::error::Error for TournamentError {}

impl From<csv::Error> for TournamentError {
    fn from(e: csv::Error) -> Self {
        TournamentError::Roster(e.to_string())
    }
}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations; rules may still change.
    #[default]
    Draft,
    /// Registration closed, bracket not generated yet.
    Locked,
    /// Bracket generated; matches being played.
    Live,
    /// Champion decided.
    Finished,
}

/// Format and rules chosen by the organizer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_id: Option<String>,
    pub format_id: String,
    pub rules: RuleConfig,
}

/// Per-player KOTH tally entry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct KothStats {
    pub wins: u32,
}

/// Full tournament document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    pub config: TournamentConfig,
    /// Registrants in registration order.
    pub players: Vec<Player>,
    #[serde(default)]
    pub champion: Option<String>,
    #[serde(default)]
    pub runner_up: Option<String>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// KOTH challengers waiting, head first.
    #[serde(default)]
    pub koth_queue: Vec<String>,
    #[serde(default)]
    pub koth_stats: BTreeMap<String, KothStats>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Create a new tournament in Draft state with no players.
    pub fn new(name: impl Into<String>, format_id: impl Into<String>, rules: RuleConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: TournamentStatus::Draft,
            config: TournamentConfig {
                sport_id: None,
                format_id: format_id.into(),
                rules,
            },
            players: Vec::new(),
            champion: None,
            runner_up: None,
            finished_at: None,
            koth_queue: Vec::new(),
            koth_stats: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a tournament with the default rules of a known sport.
    pub fn for_sport(
        name: impl Into<String>,
        format_id: impl Into<String>,
        sport_id: &str,
    ) -> Result<Self, TournamentError> {
        let rules = RuleConfig::for_sport(sport_id)
            .ok_or_else(|| TournamentError::InvalidRules(format!("unknown sport {}", sport_id)))?;
        let mut t = Self::new(name, format_id, rules);
        t.config.sport_id = Some(sport_id.to_string());
        Ok(t)
    }

    /// Create a tournament already holding the named registrants (still Draft).
    pub fn with_players<I, S>(format_id: &str, rules: RuleConfig, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut t = Self::new("Tournament", format_id, rules);
        t.players = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| Player::new(n, i))
            .collect();
        t
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Topology of the configured format.
    pub fn topology(&self) -> Result<BracketTopology, TournamentError> {
        BracketTopology::builtin(&self.config.format_id)
    }

    /// Open places left; `None` when registration is unlimited.
    pub fn available_slots(&self) -> Result<Option<usize>, TournamentError> {
        let topology = self.topology()?;
        Ok(capacity(&topology).map(|c| c.saturating_sub(self.players.len())))
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Register a player while Draft. Names must be unique
    /// (case-insensitive) and non-empty. Live KOTH registration goes
    /// through `koth::join`, which also queues the newcomer.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        user_id: Option<String>,
    ) -> Result<&Player, TournamentError> {
        if self.status != TournamentStatus::Draft {
            return Err(TournamentError::InvalidState);
        }
        let idx = self.register(name.into(), user_id)?;
        Ok(&self.players[idx])
    }

    /// Register a newcomer to a live KOTH tournament and put them at the
    /// back of the challenger queue.
    pub(crate) fn join_queue(
        &mut self,
        name: impl Into<String>,
        user_id: Option<String>,
    ) -> Result<&Player, TournamentError> {
        if self.status != TournamentStatus::Live || !self.topology()?.is_koth() {
            return Err(TournamentError::InvalidState);
        }
        let idx = self.register(name.into(), user_id)?;
        let queued = self.players[idx].name.clone();
        self.koth_queue.push(queued);
        Ok(&self.players[idx])
    }

    fn register(&mut self, name: String, user_id: Option<String>) -> Result<usize, TournamentError> {
        let topology = self.topology()?;
        let name_trimmed = name.trim();
        if name_trimmed.is_empty() {
            return Err(TournamentError::EmptyPlayerName);
        }
        let is_duplicate = self
            .players
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name_trimmed));
        if is_duplicate {
            return Err(TournamentError::DuplicatePlayerName);
        }
        if let Some(cap) = capacity(&topology) {
            if self.players.len() >= cap {
                return Err(TournamentError::TournamentFull { capacity: cap });
            }
        }
        let player = Player::new(name_trimmed, self.players.len());
        self.players.push(match user_id {
            Some(id) => player.with_user_id(id),
            None => player,
        });
        self.touch();
        Ok(self.players.len() - 1)
    }

    /// Remove a registrant by name (Draft only); later indices shift down.
    pub fn remove_player(&mut self, name: &str) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Draft {
            return Err(TournamentError::InvalidState);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| TournamentError::NotFound(format!("player {}", name)))?;
        self.players.remove(idx);
        for (i, p) in self.players.iter_mut().enumerate() {
            p.index = i;
        }
        self.touch();
        Ok(())
    }

    /// Register players from a CSV roster: one `name[,userId]` row per
    /// player, optional `name` header row. Stops at the first bad row.
    pub fn import_roster<R: std::io::Read>(&mut self, reader: R) -> Result<usize, TournamentError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut added = 0;
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let name = record.get(0).unwrap_or("");
            if row == 0 && name.eq_ignore_ascii_case("name") {
                continue;
            }
            if name.is_empty() {
                continue;
            }
            let user_id = record.get(1).filter(|u| !u.is_empty()).map(str::to_string);
            self.add_player(name, user_id)?;
            added += 1;
        }
        Ok(added)
    }

    /// Replace the rules (Draft only).
    pub fn set_rules(&mut self, rules: RuleConfig) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Draft {
            return Err(TournamentError::InvalidState);
        }
        rules.validate()?;
        self.config.rules = rules;
        self.touch();
        Ok(())
    }

    /// Close registration (Draft -> Locked).
    pub fn lock(&mut self) -> Result<(), TournamentError> {
        if self.status != TournamentStatus::Draft {
            return Err(TournamentError::InvalidState);
        }
        self.status = TournamentStatus::Locked;
        self.touch();
        Ok(())
    }

    /// Record the champion. A repeated call with the same result is a no-op;
    /// a different champion after finishing is rejected.
    pub fn finish(&mut self, champion: &str, runner_up: Option<&str>) -> Result<(), TournamentError> {
        if self.status == TournamentStatus::Finished {
            if self.champion.as_deref() == Some(champion) {
                return Ok(());
            }
            return Err(TournamentError::IntegrityViolation(format!(
                "tournament already won by {}",
                self.champion.as_deref().unwrap_or("nobody")
            )));
        }
        let now = Utc::now();
        self.status = TournamentStatus::Finished;
        self.champion = Some(champion.to_string());
        self.runner_up = runner_up.map(str::to_string);
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

fn capacity(topology: &BracketTopology) -> Option<usize> {
    (!topology.is_koth() && topology.total_slots > 0).then_some(topology.total_slots)
}
