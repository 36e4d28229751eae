//! Pitcher extractor

use super::{games_of, group_by_entity, require_columns, trimmed, BatchContext, Role, ZoneTally};
use crate::batch::{Column, ParsedBatch, PitchRow};
use crate::pipeline::records::PitcherStats;
use crate::pipeline::types::{Domain, KeyedRecords};
use std::collections::HashSet;

pub const REQUIRED_COLUMNS: [Column; 13] = [
    Column::Pitcher,
    Column::PitcherTeam,
    Column::KorBB,
    Column::PitchCall,
    Column::PlateLocHeight,
    Column::PlateLocSide,
    Column::Inning,
    Column::Outs,
    Column::Balls,
    Column::Strikes,
    Column::PAofInning,
    Column::OutsOnPlay,
    Column::Batter,
];

/// First pitch of the game: first plate appearance of the first inning, 0-0 count, nobody out
fn is_game_start(row: &PitchRow) -> bool {
    row.inning == Some(1)
        && row.outs == Some(0)
        && row.balls == Some(0)
        && row.strikes == Some(0)
        && row.pa_of_inning == Some(1)
}

/// Distinct plate appearances: (PA of inning, inning, batter, game)
fn batters_faced(rows: &[&PitchRow]) -> u64 {
    let appearances: HashSet<(Option<i64>, Option<i64>, Option<&str>, Option<&str>)> = rows
        .iter()
        .map(|row| {
            (
                row.pa_of_inning,
                row.inning,
                row.batter.as_deref(),
                trimmed(row.game_uid.as_deref()),
            )
        })
        .collect();
    appearances.len() as u64
}

pub fn extract_pitchers(parsed: &ParsedBatch, ctx: &BatchContext<'_>) -> KeyedRecords<PitcherStats> {
    let mut out = KeyedRecords::new();
    if !require_columns(parsed, Domain::Pitcher, &REQUIRED_COLUMNS, ctx) {
        return out;
    }

    for ((name, team), rows) in group_by_entity(&parsed.rows, Role::Pitcher) {
        let mut stats = PitcherStats {
            pitches: rows.len() as u64,
            ..Default::default()
        };

        let mut outs_on_play = 0u64;
        for row in &rows {
            let kor_bb = row.kor_bb.as_deref();
            stats.strikeouts += (kor_bb == Some("Strikeout")) as u64;
            stats.walks += (kor_bb == Some("Walk")) as u64;
            stats.games_started += is_game_start(row) as u64;
            outs_on_play += row.outs_on_play.unwrap_or(0).max(0) as u64;
        }
        stats.outs = stats.strikeouts + outs_on_play;
        stats.batters_faced = batters_faced(&rows);

        let zone = ZoneTally::over(&rows);
        stats.in_zone_pitches = zone.in_zone;
        stats.out_of_zone_pitches = zone.out_of_zone;
        stats.in_zone_whiffs = zone.in_zone_whiffs;
        stats.in_zone_swings = zone.in_zone_swings;
        stats.chases = zone.out_of_zone_swings;
        stats.games = games_of(&rows);

        out.insert(ctx.key(&name, &team), stats);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::test_support::batch;
    use crate::pipeline::types::AggregationKey;

    const HEADER: &str = "Pitcher,PitcherTeam,KorBB,PitchCall,PlateLocHeight,PlateLocSide,Inning,Outs,Balls,Strikes,PAofInning,OutsOnPlay,Batter,GameUID";

    fn ctx() -> BatchContext<'static> {
        BatchContext {
            batch: "2025/03/01/csv/20250301-Field-1.csv",
            season: 2025,
            sequence: 0,
        }
    }

    #[test]
    fn test_first_inning() {
        let parsed = batch(
            HEADER,
            &[
                // PA 1: called strike, then groundout
                "Ace,HOME,Undefined,StrikeCalled,2.5,0.0,1,0,0,0,1,0,Lead,G1",
                "Ace,HOME,Undefined,InPlay,2.0,0.3,1,0,0,1,1,1,Lead,G1",
                // PA 2: swinging strikeout with a chase
                "Ace,HOME,Undefined,StrikeSwinging,2.4,0.1,1,1,0,0,2,0,Second,G1",
                "Ace,HOME,Undefined,StrikeSwinging,1.0,1.3,1,1,0,1,2,0,Second,G1",
                "Ace,HOME,Strikeout,StrikeSwinging,2.9,-0.2,1,1,0,2,2,,Second,G1",
                // PA 3: walk on four balls outside the zone
                "Ace,HOME,Undefined,BallCalled,4.0,0.0,1,2,0,0,3,0,Third,G1",
                "Ace,HOME,Undefined,BallCalled,4.1,0.0,1,2,1,0,3,0,Third,G1",
                "Ace,HOME,Undefined,BallCalled,0.5,0.0,1,2,2,0,3,0,Third,G1",
                "Ace,HOME,Walk,BallCalled,2.0,1.5,1,2,3,0,3,0,Third,G1",
            ],
        );

        let out = extract_pitchers(&parsed, &ctx());
        let stats = &out[&AggregationKey::new("Ace", "HOME", 2025)];

        assert_eq!(stats.pitches, 9);
        assert_eq!(stats.strikeouts, 1);
        assert_eq!(stats.walks, 1);
        assert_eq!(stats.games_started, 1);
        assert_eq!(stats.outs, 2);
        assert_eq!(stats.innings_pitched(), 0.2);
        assert_eq!(stats.batters_faced, 3);
        assert_eq!(stats.in_zone_pitches, 4);
        assert_eq!(stats.in_zone_whiffs, 2);
        assert_eq!(stats.in_zone_swings, 3);
        assert_eq!(stats.out_of_zone_pitches, 5);
        assert_eq!(stats.chases, 1);
        assert_eq!(stats.games_played(), 1);
        assert_eq!(stats.strikeout_rate(), Some(1.0 / 3.0));
    }

    #[test]
    fn test_missing_outs_on_play_rejects_batch() {
        let parsed = batch(
            "Pitcher,PitcherTeam,KorBB,PitchCall,PlateLocHeight,PlateLocSide,Inning,Outs,Balls,Strikes,PAofInning,Batter",
            &["Ace,HOME,Undefined,StrikeCalled,2.5,0.0,1,0,0,0,1,Lead"],
        );
        assert!(extract_pitchers(&parsed, &ctx()).is_empty());
    }

    #[test]
    fn test_batters_faced_distinguishes_games() {
        let parsed = batch(
            HEADER,
            &[
                "Ace,HOME,Undefined,BallCalled,4.0,0.0,3,0,0,0,1,0,Lead,G1",
                "Ace,HOME,Undefined,BallCalled,4.0,0.0,3,0,1,0,1,0,Lead,G1",
                "Ace,HOME,Undefined,BallCalled,4.0,0.0,3,0,0,0,1,0,Lead,G2",
            ],
        );
        let out = extract_pitchers(&parsed, &ctx());
        let stats = &out[&AggregationKey::new("Ace", "HOME", 2025)];
        assert_eq!(stats.batters_faced, 2);
        assert_eq!(stats.games_started, 0);
        assert_eq!(stats.games_played(), 2);
    }
}
