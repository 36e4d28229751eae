//! Batter aggregate: counting fields, game set, derived rates

use crate::pipeline::merge::{difference_present, ratio, round3, sum_present, Merge};
use crate::pipeline::types::{AggregationKey, GameSet};
use serde::Serialize;

/// Per-batter counting totals
///
/// Rates are methods over these totals and are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatterStats {
    pub hits: u64,
    pub at_bats: u64,
    pub strikes: u64,
    pub walks: u64,
    pub strikeouts: u64,
    pub home_runs: u64,
    pub extra_base_hits: u64,
    pub plate_appearances: u64,
    pub hit_by_pitch: u64,
    pub sacrifices: u64,
    pub total_bases: u64,
    pub in_zone_pitches: u64,
    pub out_of_zone_pitches: u64,
    pub in_zone_whiffs: u64,
    pub out_of_zone_swings: u64,
    pub games: GameSet,
}

impl BatterStats {
    pub fn games_played(&self) -> usize {
        self.games.len()
    }

    pub fn batting_average(&self) -> Option<f64> {
        ratio(self.hits, self.at_bats)
    }

    pub fn on_base_percentage(&self) -> Option<f64> {
        ratio(
            self.hits + self.walks + self.hit_by_pitch,
            self.at_bats + self.walks + self.hit_by_pitch + self.sacrifices,
        )
    }

    pub fn slugging_percentage(&self) -> Option<f64> {
        ratio(self.total_bases, self.at_bats)
    }

    pub fn on_base_plus_slugging(&self) -> Option<f64> {
        sum_present(self.on_base_percentage(), self.slugging_percentage())
    }

    pub fn isolated_power(&self) -> Option<f64> {
        difference_present(self.slugging_percentage(), self.batting_average())
    }

    pub fn strikeout_rate(&self) -> Option<f64> {
        ratio(self.strikeouts, self.plate_appearances)
    }

    pub fn walk_rate(&self) -> Option<f64> {
        ratio(self.walks, self.plate_appearances)
    }

    pub fn chase_rate(&self) -> Option<f64> {
        ratio(self.out_of_zone_swings, self.out_of_zone_pitches)
    }

    pub fn whiff_rate(&self) -> Option<f64> {
        ratio(self.in_zone_whiffs, self.in_zone_pitches)
    }

    /// Export row: game set reduced to its cardinality, rates rounded
    pub fn to_row(&self, key: &AggregationKey) -> BatterRow {
        BatterRow {
            name: key.name.clone(),
            team: key.team.clone(),
            season: key.season,
            hits: self.hits as i64,
            at_bats: self.at_bats as i64,
            strikes: self.strikes as i64,
            walks: self.walks as i64,
            strikeouts: self.strikeouts as i64,
            home_runs: self.home_runs as i64,
            extra_base_hits: self.extra_base_hits as i64,
            plate_appearances: self.plate_appearances as i64,
            hit_by_pitch: self.hit_by_pitch as i64,
            sacrifices: self.sacrifices as i64,
            total_bases: self.total_bases as i64,
            in_zone_pitches: self.in_zone_pitches as i64,
            out_of_zone_pitches: self.out_of_zone_pitches as i64,
            in_zone_whiffs: self.in_zone_whiffs as i64,
            out_of_zone_swings: self.out_of_zone_swings as i64,
            games: self.games_played() as i64,
            batting_average: round3(self.batting_average()),
            on_base_percentage: round3(self.on_base_percentage()),
            slugging_percentage: round3(self.slugging_percentage()),
            on_base_plus_slugging: round3(self.on_base_plus_slugging()),
            isolated_power: round3(self.isolated_power()),
            strikeout_rate: round3(self.strikeout_rate()),
            walk_rate: round3(self.walk_rate()),
            chase_rate: round3(self.chase_rate()),
            whiff_rate: round3(self.whiff_rate()),
        }
    }
}

impl Merge for BatterStats {
    fn merge(&mut self, incoming: Self) {
        self.hits += incoming.hits;
        self.at_bats += incoming.at_bats;
        self.strikes += incoming.strikes;
        self.walks += incoming.walks;
        self.strikeouts += incoming.strikeouts;
        self.home_runs += incoming.home_runs;
        self.extra_base_hits += incoming.extra_base_hits;
        self.plate_appearances += incoming.plate_appearances;
        self.hit_by_pitch += incoming.hit_by_pitch;
        self.sacrifices += incoming.sacrifices;
        self.total_bases += incoming.total_bases;
        self.in_zone_pitches += incoming.in_zone_pitches;
        self.out_of_zone_pitches += incoming.out_of_zone_pitches;
        self.in_zone_whiffs += incoming.in_zone_whiffs;
        self.out_of_zone_swings += incoming.out_of_zone_swings;
        self.games.extend(incoming.games);
    }
}

/// Persisted batter row (`batter_stats` table)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatterRow {
    pub name: String,
    pub team: String,
    pub season: i32,
    pub hits: i64,
    pub at_bats: i64,
    pub strikes: i64,
    pub walks: i64,
    pub strikeouts: i64,
    pub home_runs: i64,
    pub extra_base_hits: i64,
    pub plate_appearances: i64,
    pub hit_by_pitch: i64,
    pub sacrifices: i64,
    pub total_bases: i64,
    pub in_zone_pitches: i64,
    pub out_of_zone_pitches: i64,
    pub in_zone_whiffs: i64,
    pub out_of_zone_swings: i64,
    pub games: i64,
    pub batting_average: Option<f64>,
    pub on_base_percentage: Option<f64>,
    pub slugging_percentage: Option<f64>,
    pub on_base_plus_slugging: Option<f64>,
    pub isolated_power: Option<f64>,
    pub strikeout_rate: Option<f64>,
    pub walk_rate: Option<f64>,
    pub chase_rate: Option<f64>,
    pub whiff_rate: Option<f64>,
}
