//! Core identity types shared by extractors, merge and persistence

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Entity identity: (entity name, team code, season)
///
/// Name and team are trimmed by the extractors but never case-normalized, so
/// "J. Doe" and "j. doe" are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregationKey {
    pub name: String,
    pub team: String,
    pub season: i32,
}

impl AggregationKey {
    pub fn new(name: impl Into<String>, team: impl Into<String>, season: i32) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            season,
        }
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.team, self.season)
    }
}

/// Statistical domain produced by one extractor
///
/// Serialized names match the per-domain keys of the ledger's result summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "batters")]
    Batter,
    #[serde(rename = "pitchers")]
    Pitcher,
    #[serde(rename = "pitches")]
    PitchType,
    #[serde(rename = "players")]
    Player,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Batter,
        Domain::Pitcher,
        Domain::PitchType,
        Domain::Player,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Batter => "batters",
            Domain::Pitcher => "pitchers",
            Domain::PitchType => "pitches",
            Domain::Player => "players",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record count per domain for one batch (or one run)
pub type DomainSummary = BTreeMap<Domain, usize>;

/// Distinct game identifiers; its cardinality is the "games" statistic
pub type GameSet = BTreeSet<String>;

/// Keyed partial or accumulated records for one domain
pub type KeyedRecords<R> = BTreeMap<AggregationKey, R>;
