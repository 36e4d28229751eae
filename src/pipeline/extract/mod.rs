//! Domain extractors: one parsed batch → keyed partial aggregates
//!
//! Each extractor is a pure function over a `ParsedBatch`. It checks its
//! required columns first; a batch missing any of them contributes nothing
//! to that domain (with a warning naming the domain and batch) while the
//! other extractors still run.
//!
//! Rows are grouped by trimmed (name, team). Rows with a missing or blank
//! name or team are skipped.

pub mod batter;
pub mod pitch_mix;
pub mod pitcher;
pub mod player;

pub use batter::extract_batters;
pub use pitch_mix::extract_pitch_mix;
pub use pitcher::extract_pitchers;
pub use player::extract_players;

use super::accumulator::AggregateSet;
use super::types::{AggregationKey, Domain, GameSet};
use crate::batch::{BatchDescriptor, Column, ParsedBatch, PitchRow};
use std::collections::BTreeMap;

/// Strike zone, in feet from the center of the plate and above the ground
pub const MIN_PLATE_SIDE: f64 = -0.86;
pub const MAX_PLATE_SIDE: f64 = 0.86;
pub const MIN_PLATE_HEIGHT: f64 = 1.77;
pub const MAX_PLATE_HEIGHT: f64 = 3.55;

pub(crate) const HIT_RESULTS: [&str; 4] = ["Single", "Double", "Triple", "HomeRun"];
pub(crate) const EXTRA_BASE_RESULTS: [&str; 3] = ["Double", "Triple", "HomeRun"];
pub(crate) const AT_BAT_RESULTS: [&str; 7] = [
    "Error",
    "Out",
    "FieldersChoice",
    "Single",
    "Double",
    "Triple",
    "HomeRun",
];
pub(crate) const STRIKE_CALLS: [&str; 3] = ["StrikeCalled", "StrikeSwinging", "FoulBallNotFieldable"];
pub(crate) const SWING_CALLS: [&str; 3] = ["StrikeSwinging", "FoulBallNotFieldable", "InPlay"];
pub(crate) const PLATE_APPEARANCE_CALLS: [&str; 2] = ["InPlay", "HitByPitch"];
pub(crate) const PLATE_APPEARANCE_KORBB: [&str; 2] = ["Walk", "Strikeout"];

/// Where a batch's rows are attributed
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    /// Batch path, used in log messages
    pub batch: &'a str,
    pub season: i32,
    /// Discovery position, orders first-seen player ids
    pub sequence: u64,
}

impl<'a> BatchContext<'a> {
    pub fn for_descriptor(descriptor: &'a BatchDescriptor) -> Self {
        Self {
            batch: &descriptor.path,
            season: descriptor.season,
            sequence: descriptor.sequence,
        }
    }

    pub(crate) fn key(&self, name: &str, team: &str) -> AggregationKey {
        AggregationKey::new(name, team, self.season)
    }
}

/// Run all four extractors over one batch
pub fn extract_all(parsed: &ParsedBatch, ctx: &BatchContext<'_>) -> AggregateSet {
    AggregateSet {
        batters: extract_batters(parsed, ctx),
        pitchers: extract_pitchers(parsed, ctx),
        pitch_mix: extract_pitch_mix(parsed, ctx),
        players: extract_players(parsed, ctx),
    }
}

/// Which side of the matchup a row is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Batter,
    Pitcher,
}

impl Role {
    pub(crate) fn name_of(self, row: &PitchRow) -> Option<&str> {
        match self {
            Role::Batter => trimmed(row.batter.as_deref()),
            Role::Pitcher => trimmed(row.pitcher.as_deref()),
        }
    }

    pub(crate) fn team_of(self, row: &PitchRow) -> Option<&str> {
        match self {
            Role::Batter => trimmed(row.batter_team.as_deref()),
            Role::Pitcher => trimmed(row.pitcher_team.as_deref()),
        }
    }

    pub(crate) fn id_of(self, row: &PitchRow) -> Option<&str> {
        match self {
            Role::Batter => trimmed(row.batter_id.as_deref()),
            Role::Pitcher => trimmed(row.pitcher_id.as_deref()),
        }
    }
}

pub(crate) fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Returns false (and warns) when any required column is absent
pub(crate) fn require_columns(
    parsed: &ParsedBatch,
    domain: Domain,
    required: &[Column],
    ctx: &BatchContext<'_>,
) -> bool {
    let missing = parsed.missing(required);
    if missing.is_empty() {
        return true;
    }

    let names: Vec<&str> = missing.iter().map(|c| c.header()).collect();
    log::warn!(
        "⚠️  {} extractor skipped {}: missing columns [{}]",
        domain,
        ctx.batch,
        names.join(", ")
    );
    false
}

/// Group rows by trimmed (name, team) for the given role
pub(crate) fn group_by_entity(rows: &[PitchRow], role: Role) -> BTreeMap<(String, String), Vec<&PitchRow>> {
    let mut groups: BTreeMap<(String, String), Vec<&PitchRow>> = BTreeMap::new();
    for row in rows {
        let (Some(name), Some(team)) = (role.name_of(row), role.team_of(row)) else {
            continue;
        };
        groups
            .entry((name.to_string(), team.to_string()))
            .or_default()
            .push(row);
    }
    groups
}

/// Distinct game ids among the given rows
pub(crate) fn games_of(rows: &[&PitchRow]) -> GameSet {
    rows.iter()
        .filter_map(|row| trimmed(row.game_uid.as_deref()))
        .map(str::to_string)
        .collect()
}

pub(crate) fn is_one_of(value: Option<&str>, labels: &[&str]) -> bool {
    value.is_some_and(|v| labels.contains(&v))
}

pub fn in_strike_zone(height: f64, side: f64) -> bool {
    (MIN_PLATE_HEIGHT..=MAX_PLATE_HEIGHT).contains(&height)
        && (MIN_PLATE_SIDE..=MAX_PLATE_SIDE).contains(&side)
}

/// Zone discipline counts shared by the batter and pitcher extractors
///
/// Pitches without both plate coordinates count toward neither zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ZoneTally {
    pub in_zone: u64,
    pub out_of_zone: u64,
    pub in_zone_whiffs: u64,
    pub in_zone_swings: u64,
    pub out_of_zone_swings: u64,
}

impl ZoneTally {
    pub(crate) fn observe(&mut self, row: &PitchRow) {
        let (Some(height), Some(side)) = (row.plate_loc_height, row.plate_loc_side) else {
            return;
        };
        let call = row.pitch_call.as_deref();
        let swung = is_one_of(call, &SWING_CALLS);

        if in_strike_zone(height, side) {
            self.in_zone += 1;
            if call == Some("StrikeSwinging") {
                self.in_zone_whiffs += 1;
            }
            if swung {
                self.in_zone_swings += 1;
            }
        } else {
            self.out_of_zone += 1;
            if swung {
                self.out_of_zone_swings += 1;
            }
        }
    }

    pub(crate) fn over(rows: &[&PitchRow]) -> Self {
        let mut tally = Self::default();
        for row in rows {
            tally.observe(row);
        }
        tally
    }
}
