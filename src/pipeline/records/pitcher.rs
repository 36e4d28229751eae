//! Pitcher aggregate

use crate::pipeline::merge::{ratio, round3, Merge};
use crate::pipeline::types::{AggregationKey, GameSet};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitcherStats {
    pub strikeouts: u64,
    pub walks: u64,
    /// Every row attributed to the pitcher
    pub pitches: u64,
    pub games_started: u64,
    /// Strikeouts plus outs recorded on balls in play
    pub outs: u64,
    pub batters_faced: u64,
    pub in_zone_pitches: u64,
    pub out_of_zone_pitches: u64,
    pub in_zone_whiffs: u64,
    pub in_zone_swings: u64,
    pub chases: u64,
    pub games: GameSet,
}

impl PitcherStats {
    pub fn games_played(&self) -> usize {
        self.games.len()
    }

    /// Innings in baseball notation: 7 outs is 2.1, not 2.33
    pub fn innings_pitched(&self) -> f64 {
        let full = self.outs / 3;
        let partial = self.outs % 3;
        (full * 10 + partial) as f64 / 10.0
    }

    pub fn strikeout_rate(&self) -> Option<f64> {
        ratio(self.strikeouts, self.batters_faced)
    }

    pub fn walk_rate(&self) -> Option<f64> {
        ratio(self.walks, self.batters_faced)
    }

    pub fn whiff_rate(&self) -> Option<f64> {
        ratio(self.in_zone_whiffs, self.in_zone_pitches)
    }

    pub fn chase_rate(&self) -> Option<f64> {
        ratio(self.chases, self.out_of_zone_pitches)
    }

    pub fn to_row(&self, key: &AggregationKey) -> PitcherRow {
        PitcherRow {
            name: key.name.clone(),
            team: key.team.clone(),
            season: key.season,
            strikeouts: self.strikeouts as i64,
            walks: self.walks as i64,
            pitches: self.pitches as i64,
            games_started: self.games_started as i64,
            outs: self.outs as i64,
            innings_pitched: self.innings_pitched(),
            batters_faced: self.batters_faced as i64,
            in_zone_pitches: self.in_zone_pitches as i64,
            out_of_zone_pitches: self.out_of_zone_pitches as i64,
            in_zone_whiffs: self.in_zone_whiffs as i64,
            in_zone_swings: self.in_zone_swings as i64,
            chases: self.chases as i64,
            games: self.games_played() as i64,
            strikeout_rate: round3(self.strikeout_rate()),
            walk_rate: round3(self.walk_rate()),
            whiff_rate: round3(self.whiff_rate()),
            chase_rate: round3(self.chase_rate()),
        }
    }
}

impl Merge for PitcherStats {
    fn merge(&mut self, incoming: Self) {
        self.strikeouts += incoming.strikeouts;
        self.walks += incoming.walks;
        self.pitches += incoming.pitches;
        self.games_started += incoming.games_started;
        self.outs += incoming.outs;
        self.batters_faced += incoming.batters_faced;
        self.in_zone_pitches += incoming.in_zone_pitches;
        self.out_of_zone_pitches += incoming.out_of_zone_pitches;
        self.in_zone_whiffs += incoming.in_zone_whiffs;
        self.in_zone_swings += incoming.in_zone_swings;
        self.chases += incoming.chases;
        self.games.extend(incoming.games);
    }
}

/// Persisted pitcher row (`pitcher_stats` table)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitcherRow {
    pub name: String,
    pub team: String,
    pub season: i32,
    pub strikeouts: i64,
    pub walks: i64,
    pub pitches: i64,
    pub games_started: i64,
    pub outs: i64,
    pub innings_pitched: f64,
    pub batters_faced: i64,
    pub in_zone_pitches: i64,
    pub out_of_zone_pitches: i64,
    pub in_zone_whiffs: i64,
    pub in_zone_swings: i64,
    pub chases: i64,
    pub games: i64,
    pub strikeout_rate: Option<f64>,
    pub walk_rate: Option<f64>,
    pub whiff_rate: Option<f64>,
    pub chase_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::merge::merge;

    #[test]
    fn test_innings_pitched_notation() {
        let mut stats = PitcherStats::default();
        assert_eq!(stats.innings_pitched(), 0.0);

        stats.outs = 7;
        assert_eq!(stats.innings_pitched(), 2.1);

        stats.outs = 9;
        assert_eq!(stats.innings_pitched(), 3.0);
    }

    #[test]
    fn test_innings_recomputed_from_merged_outs() {
        // 2.2 + 1.2 is 4.1 innings, not 3.4
        let a = PitcherStats {
            outs: 8,
            ..Default::default()
        };
        let b = PitcherStats {
            outs: 5,
            ..Default::default()
        };
        assert_eq!(merge(a, b).innings_pitched(), 4.1);
    }

    #[test]
    fn test_rates_use_batters_faced() {
        let stats = PitcherStats {
            strikeouts: 3,
            walks: 1,
            batters_faced: 12,
            ..Default::default()
        };
        let row = stats.to_row(&AggregationKey::new("P", "T", 2025));
        assert_eq!(row.strikeout_rate, Some(0.25));
        assert_eq!(row.walk_rate, Some(0.083));
        assert_eq!(row.whiff_rate, None);
        assert_eq!(row.chase_rate, None);
    }

    #[test]
    fn test_merge_unions_games() {
        let a = PitcherStats {
            pitches: 40,
            games: ["G1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let b = PitcherStats {
            pitches: 12,
            games: ["G1".to_string(), "G2".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let merged = merge(a.clone(), b.clone());
        assert_eq!(merged.pitches, 52);
        assert_eq!(merged.games_played(), 2);
        assert_eq!(merged, merge(b, a));
    }
}
