//! Pitch-type extractor

use super::{games_of, group_by_entity, require_columns, BatchContext, Role};
use crate::batch::{Column, ParsedBatch};
use crate::pipeline::records::{PitchMix, PitchType};
use crate::pipeline::types::{Domain, KeyedRecords};

pub const REQUIRED_COLUMNS: [Column; 4] = [
    Column::Pitcher,
    Column::PitcherTeam,
    Column::AutoPitchType,
    Column::TaggedPitchType,
];

pub fn extract_pitch_mix(parsed: &ParsedBatch, ctx: &BatchContext<'_>) -> KeyedRecords<PitchMix> {
    let mut out = KeyedRecords::new();
    if !require_columns(parsed, Domain::PitchType, &REQUIRED_COLUMNS, ctx) {
        return out;
    }

    for ((name, team), rows) in group_by_entity(&parsed.rows, Role::Pitcher) {
        let mut mix = PitchMix::default();
        for row in &rows {
            mix.record(PitchType::classify(
                row.auto_pitch_type.as_deref(),
                row.tagged_pitch_type.as_deref(),
            ));
        }
        mix.games = games_of(&rows);

        let unclassified = mix.count(PitchType::Other);
        if unclassified > 0 {
            log::debug!(
                "{} of {} pitches by {} ({}) in {} counted as other",
                unclassified,
                mix.total_pitches,
                name,
                team,
                ctx.batch
            );
        }

        out.insert(ctx.key(&name, &team), mix);
    }

    out
}
