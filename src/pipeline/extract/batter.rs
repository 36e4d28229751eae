//! Batter extractor

use super::{
    games_of, group_by_entity, is_one_of, require_columns, BatchContext, Role, ZoneTally,
    AT_BAT_RESULTS, EXTRA_BASE_RESULTS, HIT_RESULTS, PLATE_APPEARANCE_CALLS,
    PLATE_APPEARANCE_KORBB, STRIKE_CALLS,
};
use crate::batch::{Column, ParsedBatch};
use crate::pipeline::records::BatterStats;
use crate::pipeline::types::{Domain, KeyedRecords};

pub const REQUIRED_COLUMNS: [Column; 8] = [
    Column::Batter,
    Column::BatterTeam,
    Column::PlayResult,
    Column::KorBB,
    Column::PitchCall,
    Column::PlateLocHeight,
    Column::PlateLocSide,
    Column::TaggedHitType,
];

fn total_bases(play_result: Option<&str>) -> u64 {
    match play_result {
        Some("Single") => 1,
        Some("Double") => 2,
        Some("Triple") => 3,
        Some("HomeRun") => 4,
        _ => 0,
    }
}

pub fn extract_batters(parsed: &ParsedBatch, ctx: &BatchContext<'_>) -> KeyedRecords<BatterStats> {
    let mut out = KeyedRecords::new();
    if !require_columns(parsed, Domain::Batter, &REQUIRED_COLUMNS, ctx) {
        return out;
    }

    for ((name, team), rows) in group_by_entity(&parsed.rows, Role::Batter) {
        let mut stats = BatterStats::default();

        for row in &rows {
            let result = row.play_result.as_deref();
            let kor_bb = row.kor_bb.as_deref();
            let call = row.pitch_call.as_deref();

            let hit = is_one_of(result, &HIT_RESULTS);
            let struck_out = kor_bb == Some("Strikeout");
            let walked = kor_bb == Some("Walk");

            stats.hits += hit as u64;
            stats.at_bats += (is_one_of(result, &AT_BAT_RESULTS) || struck_out) as u64;
            stats.strikes += is_one_of(call, &STRIKE_CALLS) as u64;
            stats.walks += walked as u64;
            stats.strikeouts += struck_out as u64;
            stats.home_runs += (result == Some("HomeRun")) as u64;
            stats.extra_base_hits += is_one_of(result, &EXTRA_BASE_RESULTS) as u64;
            stats.plate_appearances += (is_one_of(kor_bb, &PLATE_APPEARANCE_KORBB)
                || is_one_of(call, &PLATE_APPEARANCE_CALLS)) as u64;
            stats.hit_by_pitch += (call == Some("HitByPitch")) as u64;
            stats.sacrifices += (result == Some("Sacrifice")) as u64;
            stats.total_bases += total_bases(result);
        }

        let zone = ZoneTally::over(&rows);
        stats.in_zone_pitches = zone.in_zone;
        stats.out_of_zone_pitches = zone.out_of_zone;
        stats.in_zone_whiffs = zone.in_zone_whiffs;
        stats.out_of_zone_swings = zone.out_of_zone_swings;
        stats.games = games_of(&rows);

        out.insert(ctx.key(&name, &team), stats);
    }

    out
}
